//! Declarative blueprints for embedded interactive elements.
//!
//! The parser never instantiates live widgets: it emits a blueprint per
//! form control or image, and the UI runtime turns blueprints into real
//! controls and keeps their state.

use serde::Serialize;
use vellum_dom::ElementData;

use crate::svg::RasterImage;

/// The normalized widget kind.
///
/// Exotic input types collapse onto the kinds the UI toolkit can actually
/// build: `number`, `email`, `url`, `tel`, `date`, `time`, `color`,
/// `range`, `datetime-local`, `month`, and `week` render as plain text
/// fields; `type=image` acts as a submit button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WidgetKind {
    /// A single-line text field.
    Text,
    /// A password field.
    Password,
    /// A submit button.
    Submit,
    /// A reset button.
    Reset,
    /// A plain button.
    Button,
    /// A checkbox.
    Checkbox,
    /// A radio button.
    Radio,
    /// A dropdown selection.
    Select,
    /// A multi-line text area.
    Textarea,
    /// A file picker.
    File,
    /// A hidden field (form state only, never rendered).
    Hidden,
    /// An image.
    Image,
}

impl WidgetKind {
    /// Normalize an `<input type=...>` value.
    #[must_use]
    pub fn from_input_type(input_type: &str) -> Self {
        match input_type.to_ascii_lowercase().as_str() {
            "password" => Self::Password,
            "submit" | "image" => Self::Submit,
            "reset" => Self::Reset,
            "button" => Self::Button,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "file" => Self::File,
            "hidden" => Self::Hidden,
            // text, search, and every exotic type collapse to text.
            _ => Self::Text,
        }
    }
}

/// One `<option>` of a select widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    /// The submission value (falls back to the label).
    pub value: String,
    /// The visible label.
    pub label: String,
    /// Whether the option carried `selected`.
    pub selected: bool,
}

/// A declarative description of an embedded interactive element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetBlueprint {
    /// The normalized kind.
    pub kind: WidgetKind,
    /// The control's `name` attribute.
    pub name: String,
    /// The initial value (or button label, or textarea content).
    pub value: String,
    /// `checked` state for checkboxes and radios.
    pub checked: bool,
    /// `disabled` state.
    pub disabled: bool,
    /// `readonly` state.
    pub readonly: bool,
    /// `required` validation flag.
    pub required: bool,
    /// `multiple` flag for selects and file pickers.
    pub multiple: bool,
    /// Index into the result's form list, when inside a `<form>`.
    pub form_index: Option<usize>,
    /// Options for select widgets.
    pub options: Vec<SelectOption>,
    /// Textarea rows.
    pub rows: u32,
    /// Textarea columns.
    pub cols: u32,
    /// Placeholder text, when declared.
    pub placeholder: Option<String>,
    /// Image source for image widgets.
    pub src: Option<String>,
    /// Alternative text for image widgets.
    pub alt: Option<String>,
    /// Pre-decoded pixels for images rendered by a collaborator (inline
    /// SVG hand-off).
    pub raster: Option<RasterImage>,
    /// `maxlength` validation attribute.
    pub maxlength: Option<u32>,
    /// `min` validation attribute, kind-dependent.
    pub min: Option<String>,
    /// `max` validation attribute, kind-dependent.
    pub max: Option<String>,
    /// `pattern` validation attribute.
    pub pattern: Option<String>,
}

impl WidgetBlueprint {
    /// A blueprint with the given kind and everything else empty.
    #[must_use]
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            name: String::new(),
            value: String::new(),
            checked: false,
            disabled: false,
            readonly: false,
            required: false,
            multiple: false,
            form_index: None,
            options: Vec::new(),
            rows: 0,
            cols: 0,
            placeholder: None,
            src: None,
            alt: None,
            raster: None,
            maxlength: None,
            min: None,
            max: None,
            pattern: None,
        }
    }

    /// Build a blueprint from an `<input>` element.
    #[must_use]
    pub fn from_input(data: &ElementData, form_index: Option<usize>) -> Self {
        let kind = WidgetKind::from_input_type(data.attrs.get("type").unwrap_or("text"));
        let mut blueprint = Self::new(kind);
        blueprint.fill_common(data, form_index);
        blueprint.checked = data.attrs.contains("checked");
        blueprint.maxlength = data.attrs.get("maxlength").and_then(|v| v.parse().ok());
        blueprint.min = data.attrs.get("min").map(str::to_string);
        blueprint.max = data.attrs.get("max").map(str::to_string);
        blueprint.pattern = data.attrs.get("pattern").map(str::to_string);
        if kind == WidgetKind::Submit && blueprint.value.is_empty() {
            blueprint.value = String::from("Submit");
        }
        blueprint
    }

    /// Build a blueprint from an `<img>` element.
    #[must_use]
    pub fn from_image(data: &ElementData, form_index: Option<usize>) -> Self {
        let mut blueprint = Self::new(WidgetKind::Image);
        blueprint.fill_common(data, form_index);
        blueprint.src = data.attrs.get("src").map(str::to_string);
        blueprint.alt = data.attrs.get("alt").map(str::to_string);
        blueprint
    }

    fn fill_common(&mut self, data: &ElementData, form_index: Option<usize>) {
        self.name = data.attrs.get("name").unwrap_or_default().to_string();
        self.value = data.attrs.get("value").unwrap_or_default().to_string();
        self.disabled = data.attrs.contains("disabled");
        self.readonly = data.attrs.contains("readonly");
        self.required = data.attrs.contains("required");
        self.multiple = data.attrs.contains("multiple");
        self.placeholder = data.attrs.get("placeholder").map(str::to_string);
        self.form_index = form_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exotic_input_types_collapse_to_text() {
        for exotic in [
            "number",
            "email",
            "url",
            "tel",
            "date",
            "time",
            "color",
            "range",
            "datetime-local",
            "month",
            "week",
        ] {
            assert_eq!(WidgetKind::from_input_type(exotic), WidgetKind::Text);
        }
    }

    #[test]
    fn image_input_acts_as_submit() {
        assert_eq!(WidgetKind::from_input_type("image"), WidgetKind::Submit);
    }

    #[test]
    fn named_types_map_directly() {
        assert_eq!(WidgetKind::from_input_type("CHECKBOX"), WidgetKind::Checkbox);
        assert_eq!(WidgetKind::from_input_type("password"), WidgetKind::Password);
        assert_eq!(WidgetKind::from_input_type("hidden"), WidgetKind::Hidden);
    }
}
