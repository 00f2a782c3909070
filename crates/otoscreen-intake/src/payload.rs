use serde::Serialize;

use crate::form::ContactForm;

/// The composed submission: form fields plus the serialized session
/// summaries captured when the flow reached the contact step.
///
/// Summaries that were never produced are absent from both wire shapes —
/// no key at all, not an empty string. The JSON field names match the
/// results route; the form-encoded names (`test_sonuclari`,
/// `anket_sonuclari`) are what the deployed relay expects.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactPayload {
    #[serde(rename = "answers", skip_serializing_if = "Option::is_none")]
    pub test_results: Option<String>,
    #[serde(rename = "survey", skip_serializing_if = "Option::is_none")]
    pub survey_results: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub comment: String,
}

impl ContactPayload {
    pub fn new(
        form: &ContactForm,
        test_results: Option<String>,
        survey_results: Option<String>,
    ) -> Self {
        Self {
            test_results: test_results.filter(|s| !s.is_empty()),
            survey_results: survey_results.filter(|s| !s.is_empty()),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            comment: form.comment.clone(),
        }
    }

    /// Field list for the form-encoded relay POST. Absent summaries are
    /// omitted entirely.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("comment", self.comment.as_str()),
        ];
        if let Some(test) = &self.test_results {
            fields.push(("test_sonuclari", test));
        }
        if let Some(survey) = &self.survey_results {
            fields.push(("anket_sonuclari", survey));
        }
        fields
    }
}
