use reqwest::multipart::{Form, Part};
use shared::domain::PatientId;

use crate::error::ValidationError;
use crate::form::{FormState, ImageAttachment};

/// One analysis submission, assembled from the form and the session
/// identifier. Built per attempt, sent once, then discarded.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub images: Vec<ImageAttachment>,
    pub description: Option<String>,
    pub conditions: Vec<String>,
    pub language: String,
    pub patient_id: Option<PatientId>,
}

impl AnalysisRequest {
    /// Validates and assembles the outbound request. Rejects when neither an
    /// image nor a non-blank description is present; nothing is sent in that
    /// case.
    pub fn assemble(
        form: &FormState,
        patient: Option<&PatientId>,
        default_language: &str,
    ) -> Result<Self, ValidationError> {
        let description = {
            let trimmed = form.description.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        if form.attachments.is_empty() && description.is_none() {
            return Err(ValidationError::EmptyRequest);
        }

        Ok(Self {
            images: form.attachments.clone(),
            description,
            conditions: form.conditions.checked(),
            language: form
                .language
                .clone()
                .unwrap_or_else(|| default_language.to_string()),
            patient_id: patient.cloned(),
        })
    }

    /// Encodes the request as the service's multipart form: one `image` part
    /// per attachment, optional `description`, always `language`, checked
    /// conditions joined as one comma-separated `conditions` field, and the
    /// session identifier as `patient_id` when captured.
    pub fn into_form(self) -> reqwest::Result<Form> {
        let mut form = Form::new();

        for image in self.images {
            let part = Part::bytes(image.bytes).file_name(image.filename);
            let part = match image.mime_type.as_deref() {
                Some(mime) => part.mime_str(mime)?,
                None => part,
            };
            form = form.part("image", part);
        }

        if let Some(description) = self.description {
            form = form.text("description", description);
        }

        form = form.text("language", self.language);

        if !self.conditions.is_empty() {
            form = form.text("conditions", self.conditions.join(", "));
        }

        if let Some(patient_id) = self.patient_id {
            form = form.text("patient_id", patient_id.0);
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with_conditions() -> FormState {
        FormState::new(&[
            "Diabetes".to_string(),
            "Hypertension".to_string(),
            "Kidney Disease".to_string(),
        ])
    }

    fn sample_image() -> ImageAttachment {
        ImageAttachment {
            filename: "rx.png".into(),
            mime_type: Some("image/png".into()),
            bytes: b"png-bytes".to_vec(),
        }
    }

    #[test]
    fn rejects_when_no_image_and_no_description() {
        let form = form_with_conditions();
        let err = AnalysisRequest::assemble(&form, None, "en").expect_err("empty form");
        assert!(matches!(err, ValidationError::EmptyRequest));
    }

    #[test]
    fn whitespace_description_counts_as_empty() {
        let mut form = form_with_conditions();
        form.description = "   \t ".into();
        let err = AnalysisRequest::assemble(&form, None, "en").expect_err("blank text");
        assert!(matches!(err, ValidationError::EmptyRequest));
    }

    #[test]
    fn image_alone_is_sufficient() {
        let mut form = form_with_conditions();
        form.attachments.push(sample_image());
        let request = AnalysisRequest::assemble(&form, None, "en").expect("image only");
        assert!(request.description.is_none());
        assert_eq!(request.images.len(), 1);
    }

    #[test]
    fn description_is_trimmed() {
        let mut form = form_with_conditions();
        form.description = "  Taking aspirin daily  ".into();
        let request = AnalysisRequest::assemble(&form, None, "en").expect("text only");
        assert_eq!(request.description.as_deref(), Some("Taking aspirin daily"));
    }

    #[test]
    fn language_falls_back_to_default() {
        let mut form = form_with_conditions();
        form.description = "notes".into();
        let request = AnalysisRequest::assemble(&form, None, "en").expect("assemble");
        assert_eq!(request.language, "en");

        form.language = Some("hi".into());
        let request = AnalysisRequest::assemble(&form, None, "en").expect("assemble");
        assert_eq!(request.language, "hi");
    }

    #[test]
    fn patient_id_copied_only_when_present() {
        let mut form = form_with_conditions();
        form.description = "notes".into();

        let anonymous = AnalysisRequest::assemble(&form, None, "en").expect("assemble");
        assert!(anonymous.patient_id.is_none());

        let patient = PatientId::new("maria");
        let identified =
            AnalysisRequest::assemble(&form, Some(&patient), "en").expect("assemble");
        assert_eq!(identified.patient_id, Some(patient));
    }

    #[test]
    fn conditions_preserve_declaration_order() {
        let mut form = form_with_conditions();
        form.description = "notes".into();
        form.conditions.toggle("Kidney Disease");
        form.conditions.toggle("Diabetes");

        let request = AnalysisRequest::assemble(&form, None, "en").expect("assemble");
        assert_eq!(
            request.conditions,
            vec!["Diabetes".to_string(), "Kidney Disease".to_string()]
        );
        assert_eq!(request.conditions.join(", "), "Diabetes, Kidney Disease");
    }
}
