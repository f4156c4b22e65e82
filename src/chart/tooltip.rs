//! The floating hover annotation

/// Distance from the pointer to the tooltip's top-left corner
pub const POINTER_OFFSET: (f64, f64) = (12.0, -28.0);

/// One reusable tooltip per chart area
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tooltip {
    visible: bool,
    text: String,
    position: (f64, f64),
}

impl Tooltip {
    pub fn show(&mut self, text: impl Into<String>, pointer: (f64, f64)) {
        self.text = text.into();
        self.visible = true;
        self.move_to(pointer);
    }

    pub fn move_to(&mut self, pointer: (f64, f64)) {
        self.position = (pointer.0 + POINTER_OFFSET.0, pointer.1 + POINTER_OFFSET.1);
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text(&self) -> Option<&str> {
        self.visible.then_some(self.text.as_str())
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }
}
