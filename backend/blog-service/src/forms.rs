//! Submitted forms and their per-field validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::{Validate, ValidationErrors};

pub const REQUIRED_MESSAGE: &str = "поле должно быть заполнено";
pub const INVALID_GROUP_MESSAGE: &str = "Select a valid group.";

/// Field name -> error messages, ready to hand to a form template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_field(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        f.write_str(&fields.join("; "))
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = match (&error.message, error.code.as_ref()) {
                    (Some(message), _) => message.to_string(),
                    (None, "required") => REQUIRED_MESSAGE.to_string(),
                    (None, code) => code.to_string(),
                };
                form_errors.add(&field.to_string(), message);
            }
        }
        form_errors
    }
}

/// Raw new-post / edit-post submission.
///
/// `group` arrives as the selected option value (empty for "no group");
/// `image` is the storage key of an already uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "image-clear", skip_serializing)]
    pub image_clear: Option<String>,
}

/// Post submission after cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
    pub clear_image: bool,
}

impl PostForm {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group = Some(group_id.to_string());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Trim, validate and parse the submission.
    pub fn clean(&self) -> Result<CleanedPost, FormErrors> {
        let normalized = PostForm {
            text: self.text.trim().to_string(),
            ..self.clone()
        };

        let mut errors = match normalized.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        let group_id = match non_blank(&normalized.group) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("group", INVALID_GROUP_MESSAGE);
                    None
                }
            },
        };

        errors.into_result()?;

        Ok(CleanedPost {
            text: normalized.text,
            group_id,
            image: non_blank(&normalized.image).map(str::to_string),
            clear_image: non_blank(&normalized.image_clear).is_some(),
        })
    }
}

/// Raw comment submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub text: String,
}

impl CommentForm {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn clean(&self) -> Result<String, FormErrors> {
        let normalized = CommentForm {
            text: self.text.trim().to_string(),
        };
        normalized.validate().map_err(FormErrors::from)?;
        Ok(normalized.text)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
