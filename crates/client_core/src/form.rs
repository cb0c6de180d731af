/// A prescription image staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The declared condition checkboxes. Order is fixed at construction and
/// survives toggling; only declared names can be toggled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionToggles {
    entries: Vec<(String, bool)>,
}

impl ConditionToggles {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: names.into_iter().map(|name| (name, false)).collect(),
        }
    }

    /// Flips the named toggle and returns its new state, or `None` when the
    /// name was never declared.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|(n, _)| n == name)?;
        entry.1 = !entry.1;
        Some(entry.1)
    }

    /// Checked names in declaration order.
    pub fn checked(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.1 = false;
        }
    }

    pub fn entries(&self) -> &[(String, bool)] {
        &self.entries
    }
}

/// Input-phase field state. Cleared between submissions by `clear_entries`;
/// the language selection is a preference and survives a form reset.
#[derive(Debug, Clone)]
pub struct FormState {
    pub attachments: Vec<ImageAttachment>,
    pub description: String,
    pub conditions: ConditionToggles,
    pub language: Option<String>,
}

impl FormState {
    pub fn new(condition_names: &[String]) -> Self {
        Self {
            attachments: Vec::new(),
            description: String::new(),
            conditions: ConditionToggles::new(condition_names.iter().cloned()),
            language: None,
        }
    }

    /// Display label for the staged attachments: a single file shows its
    /// name, several show a count, none shows nothing.
    pub fn attachment_label(&self) -> Option<String> {
        match self.attachments.as_slice() {
            [] => None,
            [only] => Some(only.filename.clone()),
            many => Some(format!("{} prescriptions selected", many.len())),
        }
    }

    /// Appends a dictated transcript to the description, separated by a
    /// single space when text is already present.
    pub fn append_dictated(&mut self, transcript: &str) {
        if transcript.is_empty() {
            return;
        }
        if !self.description.is_empty() {
            self.description.push(' ');
        }
        self.description.push_str(transcript);
    }

    pub fn clear_entries(&mut self) {
        self.attachments.clear();
        self.description.clear();
        self.conditions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_form() -> FormState {
        FormState::new(&["Diabetes".to_string(), "Hypertension".to_string()])
    }

    #[test]
    fn attachment_label_tracks_count() {
        let mut form = sample_form();
        assert_eq!(form.attachment_label(), None);

        form.attachments.push(ImageAttachment {
            filename: "rx.png".into(),
            mime_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(form.attachment_label().as_deref(), Some("rx.png"));

        form.attachments.push(ImageAttachment {
            filename: "rx2.png".into(),
            mime_type: None,
            bytes: vec![4],
        });
        assert_eq!(
            form.attachment_label().as_deref(),
            Some("2 prescriptions selected")
        );
    }

    #[test]
    fn dictation_appends_with_single_space() {
        let mut form = sample_form();
        form.append_dictated("aspirin 100mg");
        assert_eq!(form.description, "aspirin 100mg");

        form.append_dictated("taken daily");
        assert_eq!(form.description, "aspirin 100mg taken daily");

        form.append_dictated("");
        assert_eq!(form.description, "aspirin 100mg taken daily");
    }

    #[test]
    fn toggle_rejects_undeclared_condition() {
        let mut form = sample_form();
        assert_eq!(form.conditions.toggle("Hypertension"), Some(true));
        assert_eq!(form.conditions.toggle("Gout"), None);
        assert_eq!(form.conditions.checked(), vec!["Hypertension".to_string()]);
    }

    #[test]
    fn checked_conditions_keep_declaration_order() {
        let mut form = sample_form();
        form.conditions.toggle("Hypertension");
        form.conditions.toggle("Diabetes");
        assert_eq!(
            form.conditions.checked(),
            vec!["Diabetes".to_string(), "Hypertension".to_string()]
        );
    }

    #[test]
    fn clear_entries_keeps_language_selection() {
        let mut form = sample_form();
        form.language = Some("hi".into());
        form.description = "notes".into();
        form.conditions.toggle("Diabetes");
        form.attachments.push(ImageAttachment {
            filename: "rx.png".into(),
            mime_type: None,
            bytes: Vec::new(),
        });

        form.clear_entries();

        assert!(form.attachments.is_empty());
        assert!(form.description.is_empty());
        assert!(form.conditions.checked().is_empty());
        assert_eq!(form.language.as_deref(), Some("hi"));
    }
}
