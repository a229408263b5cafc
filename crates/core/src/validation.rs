//! Input validation for patient registration.
//!
//! Registration bodies arrive as raw JSON. Every field rule is checked independently and all
//! violations are reported together. Nothing here touches a store.

use crate::constants::{
    AGE_EXCLUSIVE_MAX, AGE_EXCLUSIVE_MIN, CONTACT_MAX_CHARS, CONTACT_MIN_CHARS, NAME_MAX_CHARS,
    NAME_MIN_CHARS,
};
use crate::patient::{Gender, NewPatient};
use serde_json::{Map, Number, Value};

/// Machine-readable reason for a [`Violation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// The body is not a JSON object.
    ObjectType,
    Missing,
    StringType,
    StringTooShort,
    StringTooLong,
    IntType,
    /// A string that does not hold an integer.
    IntParsing,
    IntFromFloat,
    GreaterThan,
    LessThan,
    Enum,
}

impl ViolationKind {
    /// Stable code reported to API callers.
    pub fn code(self) -> &'static str {
        match self {
            ViolationKind::ObjectType => "model_attributes_type",
            ViolationKind::Missing => "missing",
            ViolationKind::StringType => "string_type",
            ViolationKind::StringTooShort => "string_too_short",
            ViolationKind::StringTooLong => "string_too_long",
            ViolationKind::IntType => "int_type",
            ViolationKind::IntParsing => "int_parsing",
            ViolationKind::IntFromFloat => "int_from_float",
            ViolationKind::GreaterThan => "greater_than",
            ViolationKind::LessThan => "less_than",
            ViolationKind::Enum => "enum",
        }
    }
}

/// A single field-level constraint failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Offending field, or `None` when the body as a whole is rejected.
    pub field: Option<&'static str>,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn field(field: &'static str, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            kind,
            message: message.into(),
        }
    }
}

/// Every violation found in one registration body. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }

    /// Fields named by the violations, in report order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().filter_map(|v| v.field)
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match v.field {
                Some(field) => write!(f, "{field}: {}", v.message)?,
                None => f.write_str(&v.message)?,
            }
        }
        Ok(())
    }
}

/// Validates a raw registration body.
///
/// # Arguments
///
/// * `raw` - The decoded JSON request body.
///
/// # Returns
///
/// The normalised [`NewPatient`] when every rule passes.
///
/// # Errors
///
/// Returns [`Violations`] listing one entry per invalid field (or a single body-level entry when
/// `raw` is not an object). Unknown extra fields are ignored.
pub fn validate_registration(raw: &Value) -> Result<NewPatient, Violations> {
    let Some(body) = raw.as_object() else {
        return Err(Violations(vec![Violation {
            field: None,
            kind: ViolationKind::ObjectType,
            message: "Input should be a valid dictionary or object to extract fields from".into(),
        }]));
    };

    let mut violations = Vec::new();

    let name = check_text(body, "name", NAME_MIN_CHARS, NAME_MAX_CHARS, &mut violations);
    let age = check_age(body, &mut violations);
    let gender = check_gender(body, &mut violations);
    let contact = check_text(
        body,
        "contact",
        CONTACT_MIN_CHARS,
        CONTACT_MAX_CHARS,
        &mut violations,
    );

    match (name, age, gender, contact) {
        (Some(name), Some(age), Some(gender), Some(contact)) if violations.is_empty() => {
            Ok(NewPatient {
                name,
                age,
                gender,
                contact,
            })
        }
        _ => Err(Violations(violations)),
    }
}

fn missing(field: &'static str) -> Violation {
    Violation::field(field, ViolationKind::Missing, "Field required")
}

fn check_text(
    body: &Map<String, Value>,
    field: &'static str,
    min: usize,
    max: usize,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    let value = match body.get(field) {
        None => {
            violations.push(missing(field));
            return None;
        }
        Some(Value::String(s)) => s,
        Some(_) => {
            violations.push(Violation::field(
                field,
                ViolationKind::StringType,
                "Input should be a valid string",
            ));
            return None;
        }
    };

    // Lengths are counted in characters, not bytes.
    let len = value.chars().count();
    if len < min {
        violations.push(Violation::field(
            field,
            ViolationKind::StringTooShort,
            format!("String should have at least {min} characters"),
        ));
        return None;
    }
    if len > max {
        violations.push(Violation::field(
            field,
            ViolationKind::StringTooLong,
            format!("String should have at most {max} characters"),
        ));
        return None;
    }

    Some(value.clone())
}

fn check_age(body: &Map<String, Value>, violations: &mut Vec<Violation>) -> Option<i32> {
    const FIELD: &str = "age";

    let age = match body.get(FIELD) {
        None => {
            violations.push(missing(FIELD));
            return None;
        }
        Some(Value::Number(n)) => match integral_value(n) {
            Ok(age) => age,
            Err(kind) => {
                violations.push(Violation::field(
                    FIELD,
                    kind,
                    "Input should be a valid integer, got a number with a fractional part",
                ));
                return None;
            }
        },
        // Numeric strings are coerced, e.g. "30".
        Some(Value::String(s)) => match s.trim().parse::<i128>() {
            Ok(age) => age,
            Err(_) => {
                violations.push(Violation::field(
                    FIELD,
                    ViolationKind::IntParsing,
                    "Input should be a valid integer, unable to parse string as an integer",
                ));
                return None;
            }
        },
        Some(_) => {
            violations.push(Violation::field(
                FIELD,
                ViolationKind::IntType,
                "Input should be a valid integer",
            ));
            return None;
        }
    };

    if age <= i128::from(AGE_EXCLUSIVE_MIN) {
        violations.push(Violation::field(
            FIELD,
            ViolationKind::GreaterThan,
            format!("Input should be greater than {AGE_EXCLUSIVE_MIN}"),
        ));
        return None;
    }
    if age >= i128::from(AGE_EXCLUSIVE_MAX) {
        violations.push(Violation::field(
            FIELD,
            ViolationKind::LessThan,
            format!("Input should be less than {AGE_EXCLUSIVE_MAX}"),
        ));
        return None;
    }

    i32::try_from(age).ok()
}

/// Reads a JSON number as an integer, accepting floats with no fractional part.
fn integral_value(number: &Number) -> Result<i128, ViolationKind> {
    if let Some(i) = number.as_i64() {
        return Ok(i128::from(i));
    }
    if let Some(u) = number.as_u64() {
        return Ok(i128::from(u));
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            // Saturating cast; anything this large fails the bounds check anyway.
            Ok(f as i128)
        }
        _ => Err(ViolationKind::IntFromFloat),
    }
}

fn check_gender(body: &Map<String, Value>, violations: &mut Vec<Violation>) -> Option<Gender> {
    const FIELD: &str = "gender";

    let parsed = match body.get(FIELD) {
        None => {
            violations.push(missing(FIELD));
            return None;
        }
        Some(Value::String(s)) => Gender::from_wire(s),
        Some(_) => None,
    };

    if parsed.is_none() {
        let mut message = String::from("Input should be ");
        for (i, gender) in Gender::ALL.iter().enumerate() {
            if i > 0 {
                message.push_str(if i + 1 == Gender::ALL.len() { " or " } else { ", " });
            }
            message.push('\'');
            message.push_str(gender.as_str());
            message.push('\'');
        }
        violations.push(Violation::field(FIELD, ViolationKind::Enum, message));
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds_by_field(violations: &Violations) -> Vec<(&'static str, ViolationKind)> {
        violations
            .as_slice()
            .iter()
            .map(|v| (v.field.unwrap_or("<body>"), v.kind))
            .collect()
    }

    #[test]
    fn test_valid_registration_is_normalised() {
        let patient = validate_registration(&json!({
            "name": "Test Patient",
            "age": 30,
            "gender": "male",
            "contact": "1234567890"
        }))
        .expect("valid body should pass");

        assert_eq!(patient.name, "Test Patient");
        assert_eq!(patient.age, 30);
        assert_eq!(patient.gender, Gender::Male);
        assert_eq!(patient.contact, "1234567890");
    }

    #[test]
    fn test_boundaries_are_inclusive_for_lengths_and_exclusive_for_age() {
        let ok = |name: &str, age: Value, contact: &str| {
            validate_registration(&json!({
                "name": name, "age": age, "gender": "other", "contact": contact
            }))
        };

        assert!(ok("Al", json!(1), "12345").is_ok());
        assert!(ok(&"x".repeat(100), json!(149), &"9".repeat(20)).is_ok());

        assert!(ok("A", json!(30), "12345").is_err());
        assert!(ok(&"x".repeat(101), json!(30), "12345").is_err());
        assert!(ok("Al", json!(0), "12345").is_err());
        assert!(ok("Al", json!(150), "12345").is_err());
        assert!(ok("Al", json!(30), "1234").is_err());
        assert!(ok("Al", json!(30), &"9".repeat(21)).is_err());
    }

    #[test]
    fn test_every_invalid_field_is_reported() {
        let err = validate_registration(&json!({
            "name": "T",
            "age": 200,
            "gender": "invalid",
            "contact": "123"
        }))
        .expect_err("all four fields are invalid");

        assert_eq!(
            kinds_by_field(&err),
            vec![
                ("name", ViolationKind::StringTooShort),
                ("age", ViolationKind::LessThan),
                ("gender", ViolationKind::Enum),
                ("contact", ViolationKind::StringTooShort),
            ]
        );
        assert_eq!(
            err.as_slice()[2].message,
            "Input should be 'male', 'female' or 'other'"
        );
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let err = validate_registration(&json!({ "name": "Grace Hopper" }))
            .expect_err("three fields are missing");

        assert_eq!(
            kinds_by_field(&err),
            vec![
                ("age", ViolationKind::Missing),
                ("gender", ViolationKind::Missing),
                ("contact", ViolationKind::Missing),
            ]
        );
    }

    #[test]
    fn test_gender_is_case_sensitive() {
        let err = validate_registration(&json!({
            "name": "Test Patient", "age": 30, "gender": "Male", "contact": "1234567890"
        }))
        .expect_err("capitalised gender should be rejected");

        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["gender"]);
    }

    #[test]
    fn test_wrong_json_types_are_reported() {
        let err = validate_registration(&json!({
            "name": 42, "age": "thirty", "gender": 1, "contact": null
        }))
        .expect_err("every field has the wrong type");

        assert_eq!(
            kinds_by_field(&err),
            vec![
                ("name", ViolationKind::StringType),
                ("age", ViolationKind::IntParsing),
                ("gender", ViolationKind::Enum),
                ("contact", ViolationKind::StringType),
            ]
        );
    }

    #[test]
    fn test_age_accepts_integral_floats_only() {
        let body = |age: Value| {
            json!({ "name": "Test Patient", "age": age, "gender": "female", "contact": "12345" })
        };

        assert_eq!(validate_registration(&body(json!(42.0))).unwrap().age, 42);

        let err = validate_registration(&body(json!(42.5))).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("age", ViolationKind::IntFromFloat)]);

        let err = validate_registration(&body(json!(u64::MAX))).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("age", ViolationKind::LessThan)]);

        let err = validate_registration(&body(json!(-3))).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("age", ViolationKind::GreaterThan)]);
    }

    #[test]
    fn test_age_coerces_numeric_strings() {
        let body = |age: Value| {
            json!({ "name": "Test Patient", "age": age, "gender": "male", "contact": "1234567890" })
        };

        assert_eq!(validate_registration(&body(json!("30"))).unwrap().age, 30);
        assert_eq!(validate_registration(&body(json!(" 7 "))).unwrap().age, 7);

        let err = validate_registration(&body(json!("200"))).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("age", ViolationKind::LessThan)]);

        let err = validate_registration(&body(json!("3.5"))).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("age", ViolationKind::IntParsing)]);
        assert_eq!(err.as_slice()[0].kind.code(), "int_parsing");

        let err = validate_registration(&body(json!(true))).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("age", ViolationKind::IntType)]);
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // Five characters, fifteen bytes.
        let patient = validate_registration(&json!({
            "name": "Zoë", "age": 5, "gender": "other", "contact": "☎☎☎☎☎"
        }))
        .expect("multi-byte characters count once each");
        assert_eq!(patient.contact, "☎☎☎☎☎");
    }

    #[test]
    fn test_non_object_body_is_rejected_as_a_whole() {
        let err = validate_registration(&json!(["name", "age"])).unwrap_err();
        assert_eq!(kinds_by_field(&err), vec![("<body>", ViolationKind::ObjectType)]);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let patient = validate_registration(&json!({
            "name": "Test Patient", "age": 30, "gender": "male", "contact": "1234567890",
            "id": 99, "created_at": "yesterday"
        }))
        .expect("extra fields should not fail validation");
        assert_eq!(patient.with_id(1).id, 1);
    }
}
