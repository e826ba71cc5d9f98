//! Field kind tags used by the surrounding form system.

use smol_str::SmolStr;

/// The kinds of field the form layer can ask for.
///
/// Unrecognized tags are carried through rather than rejected; the form
/// layer decides how to render them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Markdown,
    Number,
    Boolean,
    Date,
    Select,
    File,
    Relationship,
    Unknown(SmolStr),
}

impl FieldKind {
    /// Map a form-definition tag to a kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "textarea" => Self::TextArea,
            "markdown" => Self::Markdown,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "select" => Self::Select,
            "file" => Self::File,
            "relationship" => Self::Relationship,
            other => {
                tracing::debug!(tag = other, "unknown field kind tag");
                Self::Unknown(SmolStr::new(other))
            }
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::TextArea => "textarea",
            Self::Markdown => "markdown",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Select => "select",
            Self::File => "file",
            Self::Relationship => "relationship",
            Self::Unknown(tag) => tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_round_trip() {
        for tag in [
            "text",
            "textarea",
            "markdown",
            "number",
            "boolean",
            "date",
            "select",
            "file",
            "relationship",
        ] {
            assert_eq!(FieldKind::from_tag(tag).as_tag(), tag);
        }
    }

    #[test]
    fn test_markdown_tag_selects_the_editor_kind() {
        assert_eq!(FieldKind::from_tag("markdown"), FieldKind::Markdown);
    }

    #[test]
    fn test_unknown_tag_carried_through() {
        let kind = FieldKind::from_tag("geo-point");
        assert_eq!(kind, FieldKind::Unknown("geo-point".into()));
        assert_eq!(kind.as_tag(), "geo-point");
    }
}
