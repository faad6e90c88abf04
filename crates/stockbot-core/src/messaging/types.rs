/// Inline keyboard of URL buttons, one button per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkKeyboard {
    pub buttons: Vec<LinkButton>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

impl LinkKeyboard {
    pub fn new(buttons: Vec<LinkButton>) -> Self {
        Self { buttons }
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}
