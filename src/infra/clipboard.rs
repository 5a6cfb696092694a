use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("clipboard has no text")]
    NoText,
}

pub fn copy_text_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|error| ClipboardError::Clipboard(error.to_string()))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|error| ClipboardError::Clipboard(error.to_string()))
}

pub fn read_text_from_clipboard() -> Result<String, ClipboardError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|error| ClipboardError::Clipboard(error.to_string()))?;
    match clipboard.get_text() {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => Err(ClipboardError::NoText),
        Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::NoText),
        Err(error) => Err(ClipboardError::Clipboard(error.to_string())),
    }
}
