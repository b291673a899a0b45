//! XML Schema datatypes
//!
//! A subset of the XSD 1.0 built-in types, exposed through the datatype
//! library contract under `http://www.w3.org/2001/XMLSchema-datatypes`. Each
//! type is a lexical parser producing an [`XsdValue`]; facets passed as
//! datatype parameters further restrict the accepted values.

use super::{DataValue, Datatype, DatatypeBuilder, DatatypeLibrary, ValidationContext, WhiteSpace};
use crate::error::{Error, Result};
use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname, split_qname};
use base64::Engine;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

// =============================================================================
// Namespace and Names
// =============================================================================

/// Namespace URI of the XML Schema datatype library
pub const XSD_DATATYPES_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-datatypes";

/// XSD length facet name
pub const XSD_LENGTH: &str = "length";
/// XSD minLength facet name
pub const XSD_MIN_LENGTH: &str = "minLength";
/// XSD maxLength facet name
pub const XSD_MAX_LENGTH: &str = "maxLength";
/// XSD pattern facet name
pub const XSD_PATTERN: &str = "pattern";
/// XSD maxInclusive facet name
pub const XSD_MAX_INCLUSIVE: &str = "maxInclusive";
/// XSD maxExclusive facet name
pub const XSD_MAX_EXCLUSIVE: &str = "maxExclusive";
/// XSD minInclusive facet name
pub const XSD_MIN_INCLUSIVE: &str = "minInclusive";
/// XSD minExclusive facet name
pub const XSD_MIN_EXCLUSIVE: &str = "minExclusive";

// =============================================================================
// XSD Value Representation
// =============================================================================

/// Value of an XSD atomic type
#[derive(Debug, Clone)]
pub enum XsdValue {
    /// String value (string, token, Name, ...)
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Decimal value, also used by the integer family
    Decimal(Decimal),
    /// Integer beyond the `Decimal` range, as `-?digits` without leading zeros
    BigInteger(String),
    /// Double value (float values are rounded to single precision)
    Double(f64),
    /// Date with an optional timezone offset in minutes
    Date(NaiveDate, Option<i32>),
    /// URI value
    Uri(String),
    /// Decoded binary value
    Binary(Vec<u8>),
    /// Resolved qualified name
    QName {
        /// Namespace URI, empty for none
        namespace: String,
        /// Local part
        local: String,
    },
}

impl PartialEq for XsdValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XsdValue::String(a), XsdValue::String(b)) => a == b,
            (XsdValue::Boolean(a), XsdValue::Boolean(b)) => a == b,
            (XsdValue::Decimal(a), XsdValue::Decimal(b)) => a == b,
            (XsdValue::BigInteger(a), XsdValue::BigInteger(b)) => a == b,
            // NaN equals itself in the value space used for <value> matching
            (XsdValue::Double(a), XsdValue::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (XsdValue::Date(a, ta), XsdValue::Date(b, tb)) => a == b && ta == tb,
            (XsdValue::Uri(a), XsdValue::Uri(b)) => a == b,
            (XsdValue::Binary(a), XsdValue::Binary(b)) => a == b,
            (
                XsdValue::QName { namespace: na, local: la },
                XsdValue::QName { namespace: nb, local: lb },
            ) => na == nb && la == lb,
            _ => false,
        }
    }
}

impl XsdValue {
    /// Order two values of the same kind; `None` if they are incomparable
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (XsdValue::Decimal(a), XsdValue::Decimal(b)) => Some(a.cmp(b)),
            (XsdValue::BigInteger(a), XsdValue::BigInteger(b)) => Some(compare_big_integers(a, b)),
            // any big integer lies outside the Decimal range
            (XsdValue::BigInteger(a), XsdValue::Decimal(_)) => Some(if a.starts_with('-') {
                Ordering::Less
            } else {
                Ordering::Greater
            }),
            (XsdValue::Decimal(_), XsdValue::BigInteger(b)) => Some(if b.starts_with('-') {
                Ordering::Greater
            } else {
                Ordering::Less
            }),
            (XsdValue::Double(a), XsdValue::Double(b)) => a.partial_cmp(b),
            (XsdValue::Date(a, ta), XsdValue::Date(b, tb)) if ta.is_some() == tb.is_some() => {
                let shift = |tz: &Option<i32>| i64::from(tz.unwrap_or(0));
                let a = a.and_hms_opt(0, 0, 0)?.and_utc().timestamp() / 60 - shift(ta);
                let b = b.and_hms_opt(0, 0, 0)?.and_utc().timestamp() / 60 - shift(tb);
                Some(a.cmp(&b))
            }
            _ => None,
        }
    }
}

fn compare_big_integers(a: &str, b: &str) -> Ordering {
    match (a.strip_prefix('-'), b.strip_prefix('-')) {
        (Some(a), Some(b)) => compare_magnitudes(b, a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_magnitudes(a, b),
    }
}

/// Digit strings without leading zeros order by length, then lexically
fn compare_magnitudes(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl fmt::Display for XsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XsdValue::String(s) | XsdValue::Uri(s) | XsdValue::BigInteger(s) => write!(f, "{}", s),
            XsdValue::Boolean(b) => write!(f, "{}", b),
            XsdValue::Decimal(d) => write!(f, "{}", d),
            XsdValue::Double(v) => {
                if v.is_nan() {
                    write!(f, "NaN")
                } else if *v == f64::INFINITY {
                    write!(f, "INF")
                } else if *v == f64::NEG_INFINITY {
                    write!(f, "-INF")
                } else {
                    write!(f, "{}", v)
                }
            }
            XsdValue::Date(d, _) => write!(f, "{}", d),
            XsdValue::Binary(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            XsdValue::QName { namespace, local } => {
                if namespace.is_empty() {
                    write!(f, "{}", local)
                } else {
                    write!(f, "{{{}}}{}", namespace, local)
                }
            }
        }
    }
}

// =============================================================================
// Built-in Types
// =============================================================================

/// XSD types supported by this library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XsdType {
    /// xsd:string
    String,
    /// xsd:normalizedString
    NormalizedString,
    /// xsd:token
    Token,
    /// xsd:Name
    Name,
    /// xsd:NCName
    NCName,
    /// xsd:NMTOKEN
    NmToken,
    /// xsd:boolean
    Boolean,
    /// xsd:decimal
    Decimal,
    /// xsd:integer
    Integer,
    /// xsd:long
    Long,
    /// xsd:int
    Int,
    /// xsd:short
    Short,
    /// xsd:byte
    Byte,
    /// xsd:nonNegativeInteger
    NonNegativeInteger,
    /// xsd:positiveInteger
    PositiveInteger,
    /// xsd:nonPositiveInteger
    NonPositiveInteger,
    /// xsd:negativeInteger
    NegativeInteger,
    /// xsd:unsignedLong
    UnsignedLong,
    /// xsd:unsignedInt
    UnsignedInt,
    /// xsd:unsignedShort
    UnsignedShort,
    /// xsd:unsignedByte
    UnsignedByte,
    /// xsd:double
    Double,
    /// xsd:float
    Float,
    /// xsd:date
    Date,
    /// xsd:anyURI
    AnyUri,
    /// xsd:base64Binary
    Base64Binary,
    /// xsd:QName
    QName,
}

impl XsdType {
    /// Look up a type by local name
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "string" => XsdType::String,
            "normalizedString" => XsdType::NormalizedString,
            "token" => XsdType::Token,
            "Name" => XsdType::Name,
            "NCName" => XsdType::NCName,
            "NMTOKEN" => XsdType::NmToken,
            "boolean" => XsdType::Boolean,
            "decimal" => XsdType::Decimal,
            "integer" => XsdType::Integer,
            "long" => XsdType::Long,
            "int" => XsdType::Int,
            "short" => XsdType::Short,
            "byte" => XsdType::Byte,
            "nonNegativeInteger" => XsdType::NonNegativeInteger,
            "positiveInteger" => XsdType::PositiveInteger,
            "nonPositiveInteger" => XsdType::NonPositiveInteger,
            "negativeInteger" => XsdType::NegativeInteger,
            "unsignedLong" => XsdType::UnsignedLong,
            "unsignedInt" => XsdType::UnsignedInt,
            "unsignedShort" => XsdType::UnsignedShort,
            "unsignedByte" => XsdType::UnsignedByte,
            "double" => XsdType::Double,
            "float" => XsdType::Float,
            "date" => XsdType::Date,
            "anyURI" => XsdType::AnyUri,
            "base64Binary" => XsdType::Base64Binary,
            "QName" => XsdType::QName,
            _ => return None,
        };
        Some(ty)
    }

    /// White space handling applied before parsing
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            XsdType::String => WhiteSpace::Preserve,
            XsdType::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    fn integer_bounds(&self) -> Option<(Option<Decimal>, Option<Decimal>)> {
        let bounds = match self {
            XsdType::Integer => (None, None),
            XsdType::Long => (Some(Decimal::from(i64::MIN)), Some(Decimal::from(i64::MAX))),
            XsdType::Int => (Some(Decimal::from(i32::MIN)), Some(Decimal::from(i32::MAX))),
            XsdType::Short => (Some(Decimal::from(i16::MIN)), Some(Decimal::from(i16::MAX))),
            XsdType::Byte => (Some(Decimal::from(i8::MIN)), Some(Decimal::from(i8::MAX))),
            XsdType::NonNegativeInteger => (Some(Decimal::ZERO), None),
            XsdType::PositiveInteger => (Some(Decimal::ONE), None),
            XsdType::NonPositiveInteger => (None, Some(Decimal::ZERO)),
            XsdType::NegativeInteger => (None, Some(Decimal::NEGATIVE_ONE)),
            XsdType::UnsignedLong => (Some(Decimal::ZERO), Some(Decimal::from(u64::MAX))),
            XsdType::UnsignedInt => (Some(Decimal::ZERO), Some(Decimal::from(u32::MAX))),
            XsdType::UnsignedShort => (Some(Decimal::ZERO), Some(Decimal::from(u16::MAX))),
            XsdType::UnsignedByte => (Some(Decimal::ZERO), Some(Decimal::from(u8::MAX))),
            _ => return None,
        };
        Some(bounds)
    }

    /// True if values of this type are ordered (range facets apply)
    pub fn is_ordered(&self) -> bool {
        matches!(self, XsdType::Decimal | XsdType::Double | XsdType::Float | XsdType::Date)
            || self.integer_bounds().is_some()
    }

    /// True if length facets apply
    pub fn has_length(&self) -> bool {
        matches!(
            self,
            XsdType::String
                | XsdType::NormalizedString
                | XsdType::Token
                | XsdType::Name
                | XsdType::NCName
                | XsdType::NmToken
                | XsdType::AnyUri
                | XsdType::Base64Binary
        )
    }

    /// Parse an already white-space-normalized lexical form
    pub fn parse(&self, value: &str, context: &dyn ValidationContext) -> Option<XsdValue> {
        match self {
            XsdType::String | XsdType::NormalizedString | XsdType::Token => {
                Some(XsdValue::String(value.to_string()))
            }
            XsdType::Name => is_valid_name(value).then(|| XsdValue::String(value.to_string())),
            XsdType::NCName => is_valid_ncname(value).then(|| XsdValue::String(value.to_string())),
            XsdType::NmToken => {
                is_valid_nmtoken(value).then(|| XsdValue::String(value.to_string()))
            }
            XsdType::Boolean => match value {
                "true" | "1" => Some(XsdValue::Boolean(true)),
                "false" | "0" => Some(XsdValue::Boolean(false)),
                _ => None,
            },
            XsdType::Decimal => parse_decimal(value).map(XsdValue::Decimal),
            XsdType::Double => parse_double(value).map(XsdValue::Double),
            XsdType::Float => parse_double(value).map(|v| XsdValue::Double(f64::from(v as f32))),
            XsdType::Date => parse_date(value).map(|(d, tz)| XsdValue::Date(d, tz)),
            XsdType::AnyUri => parse_any_uri(value).map(XsdValue::Uri),
            XsdType::Base64Binary => parse_base64(value).map(XsdValue::Binary),
            XsdType::QName => parse_qname(value, context),
            _ => {
                let (min, max) = self.integer_bounds()?;
                let n = parse_integer(value)?;
                let above_min = min.map_or(true, |min| {
                    matches!(n.compare(&XsdValue::Decimal(min)), Some(Ordering::Greater | Ordering::Equal))
                });
                let below_max = max.map_or(true, |max| {
                    matches!(n.compare(&XsdValue::Decimal(max)), Some(Ordering::Less | Ordering::Equal))
                });
                (above_min && below_max).then_some(n)
            }
        }
    }
}

// =============================================================================
// Lexical Parsers
// =============================================================================

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn strip_sign(s: &str) -> (bool, &str) {
    match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    }
}

/// Parse `[+-]?(digits(.digits?)?|.digits)`
fn parse_decimal(value: &str) -> Option<Decimal> {
    let (negative, body) = strip_sign(value);
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !(int_part.is_empty() || is_digits(int_part)) || !(frac_part.is_empty() || is_digits(frac_part)) {
        return None;
    }

    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let text = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    };
    let n = Decimal::from_str(&text).ok()?;
    Some(if negative { -n } else { n })
}

/// Parse `[+-]?digits`; any number of digits is accepted
fn parse_integer(value: &str) -> Option<XsdValue> {
    let (negative, digits) = strip_sign(value);
    if !is_digits(digits) {
        return None;
    }
    let digits = match digits.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let value = match Decimal::from_str(digits) {
        Ok(n) => XsdValue::Decimal(if negative { -n } else { n }),
        Err(_) if negative => XsdValue::BigInteger(format!("-{}", digits)),
        Err(_) => XsdValue::BigInteger(digits.to_string()),
    };
    Some(value)
}

fn parse_double(value: &str) -> Option<f64> {
    match value {
        "INF" => return Some(f64::INFINITY),
        "-INF" => return Some(f64::NEG_INFINITY),
        "NaN" => return Some(f64::NAN),
        _ => {}
    }

    let (mantissa, exponent) = match value.find(|c| c == 'e' || c == 'E') {
        Some(pos) => (&value[..pos], Some(&value[pos + 1..])),
        None => (value, None),
    };
    parse_decimal(mantissa)?;
    if let Some(exponent) = exponent {
        if !is_digits(strip_sign(exponent).1) {
            return None;
        }
    }
    value.parse::<f64>().ok()
}

/// Parse `-?YYYY-MM-DD` followed by an optional `Z` or `(+|-)hh:mm`
fn parse_date(value: &str) -> Option<(NaiveDate, Option<i32>)> {
    let (negative, body) = strip_sign(value);
    if value.starts_with('+') || !value.is_ascii() {
        return None;
    }

    let year_end = body.find('-')?;
    let year_text = &body[..year_end];
    if year_text.len() < 4 || !is_digits(year_text) {
        return None;
    }
    let rest = &body[year_end + 1..];
    if rest.len() < 5 || rest.as_bytes()[2] != b'-' {
        return None;
    }
    let (month_text, day_text, tz_text) = (&rest[..2], &rest[3..5], &rest[5..]);
    if !is_digits(month_text) || !is_digits(day_text) {
        return None;
    }

    let year: i32 = year_text.parse().ok()?;
    let year = if negative { -year } else { year };
    let date = NaiveDate::from_ymd_opt(year, month_text.parse().ok()?, day_text.parse().ok()?)?;
    Some((date, parse_timezone(tz_text)?))
}

fn parse_timezone(tz: &str) -> Option<Option<i32>> {
    match tz {
        "" => Some(None),
        "Z" => Some(Some(0)),
        _ => {
            let bytes = tz.as_bytes();
            if bytes.len() != 6 || !tz.is_ascii() || bytes[3] != b':' || !matches!(bytes[0], b'+' | b'-') {
                return None;
            }
            let (hours, minutes) = (&tz[1..3], &tz[4..6]);
            if !is_digits(hours) || !is_digits(minutes) {
                return None;
            }
            let hours: i32 = hours.parse().ok()?;
            let minutes: i32 = minutes.parse().ok()?;
            if hours > 14 || minutes > 59 || (hours == 14 && minutes != 0) {
                return None;
            }
            let offset = hours * 60 + minutes;
            Some(Some(if bytes[0] == b'-' { -offset } else { offset }))
        }
    }
}

fn parse_any_uri(value: &str) -> Option<String> {
    if value.chars().any(char::is_control) {
        return None;
    }
    if Url::parse(value).is_ok() {
        return Some(value.to_string());
    }
    // Relative references must resolve against some base
    let base = Url::parse("http://base.invalid/").ok()?;
    base.join(value).ok().map(|_| value.to_string())
}

fn parse_base64(value: &str) -> Option<Vec<u8>> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Some(Vec::new());
    }
    base64::engine::general_purpose::STANDARD.decode(cleaned).ok()
}

fn parse_qname(value: &str, context: &dyn ValidationContext) -> Option<XsdValue> {
    if !is_valid_qname(value) {
        return None;
    }
    let (prefix, local) = split_qname(value);
    let namespace = match prefix {
        Some(prefix) => context.resolve_namespace_prefix(prefix)?,
        None => context.resolve_namespace_prefix("").unwrap_or(""),
    };
    Some(XsdValue::QName {
        namespace: namespace.to_string(),
        local: local.to_string(),
    })
}

// =============================================================================
// Facets
// =============================================================================

/// Constraining facet attached to a derived datatype
#[derive(Debug, Clone)]
pub enum Facet {
    /// Exact length
    Length(usize),
    /// Minimum length
    MinLength(usize),
    /// Maximum length
    MaxLength(usize),
    /// Regular expression the normalized lexical form must match
    Pattern(Regex),
    /// Inclusive lower bound
    MinInclusive(XsdValue),
    /// Inclusive upper bound
    MaxInclusive(XsdValue),
    /// Exclusive lower bound
    MinExclusive(XsdValue),
    /// Exclusive upper bound
    MaxExclusive(XsdValue),
}

impl Facet {
    fn accepts(&self, lexical: &str, value: &XsdValue) -> bool {
        match self {
            Facet::Length(n) => length_of(lexical, value) == *n,
            Facet::MinLength(n) => length_of(lexical, value) >= *n,
            Facet::MaxLength(n) => length_of(lexical, value) <= *n,
            Facet::Pattern(re) => re.is_match(lexical),
            Facet::MinInclusive(bound) => {
                matches!(value.compare(bound), Some(Ordering::Greater | Ordering::Equal))
            }
            Facet::MaxInclusive(bound) => {
                matches!(value.compare(bound), Some(Ordering::Less | Ordering::Equal))
            }
            Facet::MinExclusive(bound) => value.compare(bound) == Some(Ordering::Greater),
            Facet::MaxExclusive(bound) => value.compare(bound) == Some(Ordering::Less),
        }
    }
}

fn length_of(lexical: &str, value: &XsdValue) -> usize {
    match value {
        XsdValue::Binary(bytes) => bytes.len(),
        _ => lexical.chars().count(),
    }
}

/// Compile an XSD pattern; XSD patterns are implicitly anchored
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let translated = pattern
        .replace("\\i", "[_:A-Za-z]")
        .replace("\\c", "[-._:A-Za-z0-9]");
    Regex::new(&format!("^(?:{})$", translated))
        .map_err(|e| Error::Datatype(format!("invalid pattern '{}': {}", pattern, e)))
}

// =============================================================================
// Datatype and Library
// =============================================================================

/// An XSD type with its facets
#[derive(Debug, Clone)]
pub struct XsdDatatype {
    base: XsdType,
    facets: Vec<Facet>,
}

impl XsdDatatype {
    /// Datatype without facets
    pub fn new(base: XsdType) -> Self {
        Self {
            base,
            facets: Vec::new(),
        }
    }

    /// The underlying built-in type
    pub fn base(&self) -> XsdType {
        self.base
    }

    /// Parse `text` and check every facet
    pub fn parse(&self, text: &str, context: &dyn ValidationContext) -> Option<XsdValue> {
        let lexical = self.base.white_space().normalize(text);
        let value = self.base.parse(&lexical, context)?;
        self.facets
            .iter()
            .all(|facet| facet.accepts(&lexical, &value))
            .then_some(value)
    }
}

impl Datatype for XsdDatatype {
    fn is_valid(&self, text: &str, context: &dyn ValidationContext) -> bool {
        self.parse(text, context).is_some()
    }

    fn create_value(&self, text: &str, context: &dyn ValidationContext) -> Option<DataValue> {
        self.parse(text, context).map(|v| Box::new(v) as DataValue)
    }

    fn same_value(&self, lhs: &DataValue, rhs: &DataValue) -> bool {
        match (lhs.downcast_ref::<XsdValue>(), rhs.downcast_ref::<XsdValue>()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        }
    }

    fn is_context_dependent(&self) -> bool {
        self.base == XsdType::QName
    }
}

/// Builder collecting facets for one XSD type
#[derive(Debug)]
pub struct XsdDatatypeBuilder {
    name: String,
    datatype: XsdDatatype,
}

impl XsdDatatypeBuilder {
    fn length_param(&self, facet: &str, value: &str) -> Result<usize> {
        if !self.datatype.base.has_length() {
            return Err(self.not_applicable(facet));
        }
        value.trim().parse().map_err(|_| {
            Error::Datatype(format!("facet {} requires a non-negative integer, got '{}'", facet, value))
        })
    }

    fn bound_param(&self, facet: &str, value: &str, context: &dyn ValidationContext) -> Result<XsdValue> {
        if !self.datatype.base.is_ordered() {
            return Err(self.not_applicable(facet));
        }
        let base = XsdDatatype::new(self.datatype.base);
        base.parse(value, context).ok_or_else(|| {
            Error::Datatype(format!("'{}' is not a valid {} for facet {}", value, self.name, facet))
        })
    }

    fn not_applicable(&self, facet: &str) -> Error {
        Error::Datatype(format!("facet {} is not applicable to {}", facet, self.name))
    }
}

impl DatatypeBuilder for XsdDatatypeBuilder {
    fn add_parameter(&mut self, name: &str, value: &str, context: &dyn ValidationContext) -> Result<()> {
        let facet = match name {
            XSD_LENGTH => Facet::Length(self.length_param(name, value)?),
            XSD_MIN_LENGTH => Facet::MinLength(self.length_param(name, value)?),
            XSD_MAX_LENGTH => Facet::MaxLength(self.length_param(name, value)?),
            XSD_PATTERN => Facet::Pattern(compile_pattern(value)?),
            XSD_MIN_INCLUSIVE => Facet::MinInclusive(self.bound_param(name, value, context)?),
            XSD_MAX_INCLUSIVE => Facet::MaxInclusive(self.bound_param(name, value, context)?),
            XSD_MIN_EXCLUSIVE => Facet::MinExclusive(self.bound_param(name, value, context)?),
            XSD_MAX_EXCLUSIVE => Facet::MaxExclusive(self.bound_param(name, value, context)?),
            _ => {
                return Err(Error::Datatype(format!(
                    "unsupported facet '{}' for {}",
                    name, self.name
                )))
            }
        };
        self.datatype.facets.push(facet);
        Ok(())
    }

    fn create_datatype(self: Box<Self>) -> Result<Arc<dyn Datatype>> {
        Ok(Arc::new(self.datatype))
    }
}

/// The XML Schema datatype library
#[derive(Debug, Clone, Copy, Default)]
pub struct XsdLibrary;

impl XsdLibrary {
    /// Create the library
    pub fn new() -> Self {
        Self
    }
}

impl DatatypeLibrary for XsdLibrary {
    fn create_datatype_builder(&self, local_name: &str) -> Result<Box<dyn DatatypeBuilder>> {
        let base = XsdType::from_name(local_name)
            .ok_or_else(|| Error::Datatype(format!("unknown XSD datatype '{}'", local_name)))?;
        Ok(Box::new(XsdDatatypeBuilder {
            name: local_name.to_string(),
            datatype: XsdDatatype::new(base),
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
