use std::collections::BTreeMap;

use crate::schema::{FieldDef, Fields};

/// Field name to message. Empty means valid.
pub type FieldErrors = BTreeMap<String, String>;

pub fn validate(schema: &[FieldDef], fields: &Fields) -> FieldErrors {
    schema
        .iter()
        .filter(|field| field.required)
        .filter(|field| is_blank(fields.get(field.name)))
        .map(|field| (field.name.to_string(), format!("{} is required", field.label)))
        .collect()
}

fn is_blank(value: Option<&Option<String>>) -> bool {
    match value {
        Some(Some(value)) => value.trim().is_empty(),
        _ => true,
    }
}

/// Trims a submitted value and turns blank input into null.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Resource;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[test]
    fn test_complete_form_is_valid() {
        let course = fields(&[
            ("name", "NEET Crash Course"),
            ("description", "Six weeks"),
            ("category", "NEET"),
        ]);
        assert!(validate(Resource::Course.fields(), &course).is_empty());
    }

    #[test]
    fn test_reports_exactly_the_blank_fields() {
        for resource in Resource::ALL {
            let required: Vec<&str> = resource
                .fields()
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name)
                .collect();

            for blank in &required {
                let mut form = resource.blank_form();
                for name in &required {
                    if name != blank {
                        form.insert(name.to_string(), Some("filled".into()));
                    }
                }

                let errors = validate(resource.fields(), &form);
                assert_eq!(errors.keys().collect::<Vec<_>>(), vec![*blank]);
            }
        }
    }

    #[test]
    fn test_whitespace_and_null_are_blank() {
        let mut video = fields(&[("title", "   ")]);
        video.insert("youtubeLink".into(), None);

        let errors = validate(Resource::DemoVideo.fields(), &video);
        assert_eq!(errors.get("title").unwrap(), "Title is required");
        assert_eq!(errors.get("youtubeLink").unwrap(), "YouTube link is required");
    }

    #[test]
    fn test_optional_fields_never_error() {
        let inquiry = fields(&[("name", "Asha"), ("email", "asha@example.com")]);
        assert!(validate(Resource::Inquiry.fields(), &inquiry).is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Some("  12 Class ")), Some("12 Class".into()));
        assert_eq!(normalize(Some("   ")), None);
        assert_eq!(normalize(None), None);
    }
}
