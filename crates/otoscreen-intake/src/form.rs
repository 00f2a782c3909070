/// Contact capture fields.
///
/// Name and phone are required; email and comment are free-form and
/// optional. No format enforcement beyond that — the deployed form never
/// validated email shape either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub comment: String,
}

impl ContactForm {
    /// Submittable iff name and phone are non-empty after trimming.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.phone.trim().is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_iff_name_and_phone_survive_trimming() {
        let mut form = ContactForm::default();
        assert!(!form.is_valid());

        form.name = "Ali Veli".into();
        assert!(!form.is_valid());

        form.phone = "05551234567".into();
        assert!(form.is_valid());

        // Whitespace-only required fields do not count.
        form.phone = "   ".into();
        assert!(!form.is_valid());
    }

    #[test]
    fn email_and_comment_do_not_affect_validity() {
        let form = ContactForm {
            name: "Ali Veli".into(),
            phone: "05551234567".into(),
            ..Default::default()
        };
        assert!(form.is_valid());

        let with_extras = ContactForm {
            email: "not really an email".into(),
            comment: "call me".into(),
            ..form
        };
        assert!(with_extras.is_valid());
    }

    #[test]
    fn clear_resets_every_field() {
        let mut form = ContactForm {
            name: "Ali Veli".into(),
            email: "a@example.com".into(),
            phone: "05551234567".into(),
            comment: "hello".into(),
        };
        form.clear();
        assert_eq!(form, ContactForm::default());
    }
}
