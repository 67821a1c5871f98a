use {
    std::sync::{Arc, Mutex},
    crate::error::DisplayError,
};

/// Identifier of the page element that shows the block count.
pub const COUNTER_ELEMENT_ID: &str = "counter";

/// Somewhere the block count is shown. Writes overwrite the previous text.
pub trait CounterDisplay {
    fn set_text(&self, text: &str) -> Result<(), DisplayError>;
}

impl<T: CounterDisplay + ?Sized> CounterDisplay for &T {
    fn set_text(&self, text: &str) -> Result<(), DisplayError> {
        (**self).set_text(text)
    }
}

impl<T: CounterDisplay + ?Sized> CounterDisplay for Arc<T> {
    fn set_text(&self, text: &str) -> Result<(), DisplayError> {
        self.as_ref().set_text(text)
    }
}

#[derive(Debug, Default)]
pub struct MemoryDisplay {
    text: Mutex<String>,
}

impl MemoryDisplay {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(initial.into()),
        }
    }

    pub fn text(&self) -> String {
        match self.text.lock() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CounterDisplay for MemoryDisplay {
    fn set_text(&self, text: &str) -> Result<(), DisplayError> {
        let mut current = match self.text.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = text.to_owned();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use dom::DomElement;

#[cfg(target_arch = "wasm32")]
mod dom {
    use super::*;

    /// Page element looked up by id on every write, so a re-rendered page is picked up.
    pub struct DomElement {
        id: String,
    }

    impl DomElement {
        pub fn new(id: impl Into<String>) -> Self {
            Self { id: id.into() }
        }
    }

    impl CounterDisplay for DomElement {
        fn set_text(&self, text: &str) -> Result<(), DisplayError> {
            let element = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.id))
                .ok_or_else(|| DisplayError::ElementNotFound { id: self.id.clone() })?;
            element.set_text_content(Some(text));
            Ok(())
        }
    }
}
