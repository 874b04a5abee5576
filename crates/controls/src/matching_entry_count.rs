//! Matching entry count request and response controls.
//!
//! The request control asks the server to report how many entries match a
//! search, and how hard it may work to find out; the response control
//! carries the answer, which may be exact, a bound, or unknown.

use ldapext_ber::{BerElement, BerTag};
use serde_json::{Map, Value};

use crate::codec;
use crate::json::{self, EnvelopeBody, FieldMap};
use crate::{ControlError, ControlType, RawControl};

const TYPE_MAX_CANDIDATES: u8 = 0;
const TYPE_ALWAYS_EXAMINE: u8 = 1;
const TYPE_PROCESS_IF_UNINDEXED: u8 = 2;
const TYPE_INCLUDE_DEBUG_INFO: u8 = 3;

const FIELD_MAX_CANDIDATES: &str = "max-candidates-to-examine";
const FIELD_ALWAYS_EXAMINE: &str = "always-examine-candidates";
const FIELD_PROCESS_IF_UNINDEXED: &str = "process-search-if-unindexed";
const FIELD_INCLUDE_DEBUG_INFO: &str = "include-debug-info";

/// Matching entry count request control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingEntryCountRequestControl {
    criticality: bool,
    max_candidates_to_examine: u32,
    always_examine_candidates: bool,
    process_search_if_unindexed: bool,
    include_debug_info: bool,
}

impl Default for MatchingEntryCountRequestControl {
    fn default() -> Self {
        Self::new(0, false, false, false)
    }
}

impl MatchingEntryCountRequestControl {
    pub fn new(
        max_candidates_to_examine: u32,
        always_examine_candidates: bool,
        process_search_if_unindexed: bool,
        include_debug_info: bool,
    ) -> Self {
        Self {
            criticality: true,
            max_candidates_to_examine,
            always_examine_candidates,
            process_search_if_unindexed,
            include_debug_info,
        }
    }

    pub fn with_criticality(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    /// Maximum candidate entries the server may examine; zero means no
    /// candidates are examined.
    pub fn max_candidates_to_examine(&self) -> u32 {
        self.max_candidates_to_examine
    }

    pub fn always_examine_candidates(&self) -> bool {
        self.always_examine_candidates
    }

    pub fn process_search_if_unindexed(&self) -> bool {
        self.process_search_if_unindexed
    }

    pub fn include_debug_info(&self) -> bool {
        self.include_debug_info
    }

    fn value_elements(&self) -> Vec<BerElement> {
        let mut elements = Vec::new();
        if self.max_candidates_to_examine > 0 {
            elements.push(
                BerElement::integer(self.max_candidates_to_examine as i64)
                    .retag(BerTag::context(TYPE_MAX_CANDIDATES)),
            );
        }
        if self.always_examine_candidates {
            elements.push(BerElement::boolean(true).retag(BerTag::context(TYPE_ALWAYS_EXAMINE)));
        }
        if self.process_search_if_unindexed {
            elements
                .push(BerElement::boolean(true).retag(BerTag::context(TYPE_PROCESS_IF_UNINDEXED)));
        }
        if self.include_debug_info {
            elements
                .push(BerElement::boolean(true).retag(BerTag::context(TYPE_INCLUDE_DEBUG_INFO)));
        }
        elements
    }

    fn value_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            FIELD_MAX_CANDIDATES.into(),
            Value::from(self.max_candidates_to_examine),
        );
        map.insert(
            FIELD_ALWAYS_EXAMINE.into(),
            Value::Bool(self.always_examine_candidates),
        );
        map.insert(
            FIELD_PROCESS_IF_UNINDEXED.into(),
            Value::Bool(self.process_search_if_unindexed),
        );
        map.insert(
            FIELD_INCLUDE_DEBUG_INFO.into(),
            Value::Bool(self.include_debug_info),
        );
        Value::Object(map)
    }

    fn from_value_json(
        criticality: bool,
        map: &Map<String, Value>,
        strict: bool,
    ) -> Result<Self, ControlError> {
        let fields = FieldMap::new(Self::OID, map);
        fields.reject_unknown(
            &[
                FIELD_MAX_CANDIDATES,
                FIELD_ALWAYS_EXAMINE,
                FIELD_PROCESS_IF_UNINDEXED,
                FIELD_INCLUDE_DEBUG_INFO,
            ],
            strict,
        )?;

        let max = fields.u64_field(FIELD_MAX_CANDIDATES)?.unwrap_or(0);
        if max > u32::MAX as u64 {
            return Err(ControlError::out_of_range(
                Self::OID,
                FIELD_MAX_CANDIDATES,
                max as i64,
            ));
        }

        Ok(Self {
            criticality,
            max_candidates_to_examine: max as u32,
            always_examine_candidates: fields.bool_field(FIELD_ALWAYS_EXAMINE)?.unwrap_or(false),
            process_search_if_unindexed: fields
                .bool_field(FIELD_PROCESS_IF_UNINDEXED)?
                .unwrap_or(false),
            include_debug_info: fields.bool_field(FIELD_INCLUDE_DEBUG_INFO)?.unwrap_or(false),
        })
    }
}

impl ControlType for MatchingEntryCountRequestControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.36";
    const NAME: &'static str = "Matching Entry Count Request Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut control = Self {
            criticality: raw.criticality(),
            ..Self::default()
        };

        for child in &children {
            if child.tag.is_context(TYPE_MAX_CANDIDATES) {
                let value = codec::integer(Self::OID, child)?;
                if !(0..=u32::MAX as i64).contains(&value) {
                    return Err(ControlError::out_of_range(
                        Self::OID,
                        FIELD_MAX_CANDIDATES,
                        value,
                    ));
                }
                control.max_candidates_to_examine = value as u32;
            } else if child.tag.is_context(TYPE_ALWAYS_EXAMINE) {
                control.always_examine_candidates = codec::boolean(Self::OID, child)?;
            } else if child.tag.is_context(TYPE_PROCESS_IF_UNINDEXED) {
                control.process_search_if_unindexed = codec::boolean(Self::OID, child)?;
            } else if child.tag.is_context(TYPE_INCLUDE_DEBUG_INFO) {
                control.include_debug_info = codec::boolean(Self::OID, child)?;
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }

        Ok(control)
    }

    fn to_control(&self) -> RawControl {
        let value = BerElement::sequence(self.value_elements()).encode();
        RawControl::new(Self::OID, self.criticality, Some(value))
    }

    fn to_json(&self) -> Value {
        json::envelope(Self::OID, Self::NAME, self.criticality, Some(self.value_json()))
    }

    fn from_json(value: &Value, strict: bool) -> Result<Self, ControlError> {
        let envelope = json::parse_envelope(Self::OID, value, strict)?;
        match envelope.body {
            EnvelopeBody::Json(map) => Self::from_value_json(envelope.criticality, map, strict),
            EnvelopeBody::Base64(bytes) => Self::decode_control(&RawControl::new(
                Self::OID,
                envelope.criticality,
                Some(bytes),
            )),
            EnvelopeBody::Absent => Err(ControlError::missing_value(Self::OID)),
        }
    }
}

const TYPE_EXAMINED_COUNT: u8 = 0;
const TYPE_UNEXAMINED_COUNT: u8 = 1;
const TYPE_UPPER_BOUND: u8 = 2;
const TYPE_UNKNOWN: u8 = 3;
const TYPE_DEBUG_INFO: u8 = 4;

const FIELD_COUNT_TYPE: &str = "count-type";
const FIELD_COUNT_VALUE: &str = "count-value";
const FIELD_SEARCH_INDEXED: &str = "search-indexed";
const FIELD_DEBUG_INFO: &str = "debug-info";

/// How precisely the server could determine the matching entry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingEntryCount {
    /// Exact count; candidates were examined.
    ExaminedCount(u32),
    /// Exact candidate count; candidates were not examined.
    UnexaminedCount(u32),
    /// The count is at most this value.
    UpperBound(u32),
    /// The server could not determine a count.
    Unknown,
}

impl MatchingEntryCount {
    fn type_name(self) -> &'static str {
        match self {
            Self::ExaminedCount(_) => "examined-count",
            Self::UnexaminedCount(_) => "unexamined-count",
            Self::UpperBound(_) => "upper-bound",
            Self::Unknown => "unknown",
        }
    }

    fn count_value(self) -> Option<u32> {
        match self {
            Self::ExaminedCount(count)
            | Self::UnexaminedCount(count)
            | Self::UpperBound(count) => Some(count),
            Self::Unknown => None,
        }
    }
}

/// Matching entry count response control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingEntryCountResponseControl {
    criticality: bool,
    count: MatchingEntryCount,
    search_indexed: bool,
    debug_info: Vec<String>,
}

impl MatchingEntryCountResponseControl {
    pub fn new(count: MatchingEntryCount, search_indexed: bool, debug_info: Vec<String>) -> Self {
        Self {
            criticality: false,
            count,
            search_indexed,
            debug_info,
        }
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn count(&self) -> MatchingEntryCount {
        self.count
    }

    pub fn search_indexed(&self) -> bool {
        self.search_indexed
    }

    pub fn debug_info(&self) -> &[String] {
        &self.debug_info
    }

    fn value_elements(&self) -> Vec<BerElement> {
        let count_element = match self.count {
            MatchingEntryCount::ExaminedCount(count) => {
                BerElement::integer(count as i64).retag(BerTag::context(TYPE_EXAMINED_COUNT))
            }
            MatchingEntryCount::UnexaminedCount(count) => {
                BerElement::integer(count as i64).retag(BerTag::context(TYPE_UNEXAMINED_COUNT))
            }
            MatchingEntryCount::UpperBound(count) => {
                BerElement::integer(count as i64).retag(BerTag::context(TYPE_UPPER_BOUND))
            }
            MatchingEntryCount::Unknown => {
                BerElement::from_parts(BerTag::context(TYPE_UNKNOWN), Vec::new())
            }
        };
        let mut elements = vec![count_element, BerElement::boolean(self.search_indexed)];
        if !self.debug_info.is_empty() {
            elements.push(BerElement::constructed(
                BerTag::context_constructed(TYPE_DEBUG_INFO),
                codec::string_elements(&self.debug_info),
            ));
        }
        elements
    }

    fn value_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            FIELD_COUNT_TYPE.into(),
            Value::String(self.count.type_name().into()),
        );
        if let Some(count) = self.count.count_value() {
            map.insert(FIELD_COUNT_VALUE.into(), Value::from(count));
        }
        map.insert(FIELD_SEARCH_INDEXED.into(), Value::Bool(self.search_indexed));
        if !self.debug_info.is_empty() {
            map.insert(
                FIELD_DEBUG_INFO.into(),
                Value::Array(
                    self.debug_info
                        .iter()
                        .map(|line| Value::String(line.clone()))
                        .collect(),
                ),
            );
        }
        Value::Object(map)
    }

    fn from_value_json(
        criticality: bool,
        map: &Map<String, Value>,
        strict: bool,
    ) -> Result<Self, ControlError> {
        let fields = FieldMap::new(Self::OID, map);
        fields.reject_unknown(
            &[
                FIELD_COUNT_TYPE,
                FIELD_COUNT_VALUE,
                FIELD_SEARCH_INDEXED,
                FIELD_DEBUG_INFO,
            ],
            strict,
        )?;

        let count_type = fields.require(FIELD_COUNT_TYPE, fields.str_field(FIELD_COUNT_TYPE)?)?;
        let count_value = fields.u64_field(FIELD_COUNT_VALUE)?;
        let count_of = |value: Option<u64>| -> Result<u32, ControlError> {
            let value = value
                .ok_or_else(|| ControlError::missing_field(Self::OID, FIELD_COUNT_VALUE))?;
            if value > u32::MAX as u64 {
                return Err(ControlError::out_of_range(
                    Self::OID,
                    FIELD_COUNT_VALUE,
                    value as i64,
                ));
            }
            Ok(value as u32)
        };
        let count = match count_type {
            "examined-count" => MatchingEntryCount::ExaminedCount(count_of(count_value)?),
            "unexamined-count" => MatchingEntryCount::UnexaminedCount(count_of(count_value)?),
            "upper-bound" => MatchingEntryCount::UpperBound(count_of(count_value)?),
            "unknown" => {
                if count_value.is_some() {
                    return Err(ControlError::invalid_json(
                        Self::OID,
                        "`count-value` is not allowed with count-type `unknown`",
                    ));
                }
                MatchingEntryCount::Unknown
            }
            other => {
                return Err(ControlError::invalid_json(
                    Self::OID,
                    format!("unrecognized count-type `{other}`"),
                ));
            }
        };

        let search_indexed =
            fields.require(FIELD_SEARCH_INDEXED, fields.bool_field(FIELD_SEARCH_INDEXED)?)?;
        let debug_info = fields
            .string_array_field(FIELD_DEBUG_INFO)?
            .unwrap_or_default();

        Ok(Self {
            criticality,
            count,
            search_indexed,
            debug_info,
        })
    }
}

impl ControlType for MatchingEntryCountResponseControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.37";
    const NAME: &'static str = "Matching Entry Count Response Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut count = None;
        let mut search_indexed = None;
        let mut debug_info = Vec::new();

        let count_of = |child: &BerElement, field: &'static str| -> Result<u32, ControlError> {
            let value = codec::integer(Self::OID, child)?;
            if !(0..=u32::MAX as i64).contains(&value) {
                return Err(ControlError::out_of_range(Self::OID, field, value));
            }
            Ok(value as u32)
        };

        for child in &children {
            if child.tag.is_context(TYPE_EXAMINED_COUNT) {
                count = Some(MatchingEntryCount::ExaminedCount(count_of(
                    child,
                    FIELD_COUNT_VALUE,
                )?));
            } else if child.tag.is_context(TYPE_UNEXAMINED_COUNT) {
                count = Some(MatchingEntryCount::UnexaminedCount(count_of(
                    child,
                    FIELD_COUNT_VALUE,
                )?));
            } else if child.tag.is_context(TYPE_UPPER_BOUND) {
                count = Some(MatchingEntryCount::UpperBound(count_of(
                    child,
                    FIELD_COUNT_VALUE,
                )?));
            } else if child.tag.is_context(TYPE_UNKNOWN) {
                if !child.value().is_empty() {
                    return Err(ControlError::invalid_value(
                        Self::OID,
                        "unknown-count element must be empty",
                    ));
                }
                count = Some(MatchingEntryCount::Unknown);
            } else if child.tag == BerTag::BOOLEAN {
                search_indexed = Some(codec::boolean(Self::OID, child)?);
            } else if child.tag.is_context(TYPE_DEBUG_INFO) {
                debug_info = codec::string_values(Self::OID, child)?;
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }

        Ok(Self {
            criticality: raw.criticality(),
            count: count
                .ok_or_else(|| ControlError::missing_field(Self::OID, FIELD_COUNT_TYPE))?,
            search_indexed: search_indexed
                .ok_or_else(|| ControlError::missing_field(Self::OID, FIELD_SEARCH_INDEXED))?,
            debug_info,
        })
    }

    fn to_control(&self) -> RawControl {
        let value = BerElement::sequence(self.value_elements()).encode();
        RawControl::new(Self::OID, self.criticality, Some(value))
    }

    fn to_json(&self) -> Value {
        json::envelope(Self::OID, Self::NAME, self.criticality, Some(self.value_json()))
    }

    fn from_json(value: &Value, strict: bool) -> Result<Self, ControlError> {
        let envelope = json::parse_envelope(Self::OID, value, strict)?;
        match envelope.body {
            EnvelopeBody::Json(map) => Self::from_value_json(envelope.criticality, map, strict),
            EnvelopeBody::Base64(bytes) => Self::decode_control(&RawControl::new(
                Self::OID,
                envelope.criticality,
                Some(bytes),
            )),
            EnvelopeBody::Absent => Err(ControlError::missing_value(Self::OID)),
        }
    }
}
