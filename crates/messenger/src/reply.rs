//! Reply payloads in the Send API `message` shape.

use serde::Serialize;

/// The `message` object of a Send API request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyPayload {
    Text { text: String },
    Attachment { attachment: TemplateAttachment },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateAttachment {
    #[serde(rename = "type")]
    attachment_type: &'static str,
    pub payload: TemplatePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "template_type", rename_all = "snake_case")]
pub enum TemplatePayload {
    /// One or more cards with image, subtitle and buttons.
    Generic { elements: Vec<Element> },
    /// A vertical list of items with shared buttons at the bottom.
    List {
        top_element_style: &'static str,
        elements: Vec<Element>,
        buttons: Vec<Button>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    button_type: &'static str,
    pub title: String,
    pub url: String,
    webview_height_ratio: &'static str,
}

impl Button {
    /// A button that opens `url` in the full-height in-app webview.
    pub fn web_url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            button_type: "web_url",
            title: title.into(),
            url: url.into(),
            webview_height_ratio: "full",
        }
    }
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn generic(elements: Vec<Element>) -> Self {
        Self::template(TemplatePayload::Generic { elements })
    }

    pub fn list(elements: Vec<Element>, buttons: Vec<Button>) -> Self {
        Self::template(TemplatePayload::List {
            top_element_style: "compact",
            elements,
            buttons,
        })
    }

    fn template(payload: TemplatePayload) -> Self {
        Self::Attachment {
            attachment: TemplateAttachment {
                attachment_type: "template",
                payload,
            },
        }
    }

    /// True for a text reply with no visible characters or a template with
    /// no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text } => text.trim().is_empty(),
            Self::Attachment { attachment } => match &attachment.payload {
                TemplatePayload::Generic { elements } | TemplatePayload::List { elements, .. } => {
                    elements.is_empty()
                },
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Attachment { .. } => None,
        }
    }

    pub fn elements(&self) -> &[Element] {
        match self {
            Self::Text { .. } => &[],
            Self::Attachment { attachment } => match &attachment.payload {
                TemplatePayload::Generic { elements } | TemplatePayload::List { elements, .. } => {
                    elements
                },
            },
        }
    }
}
