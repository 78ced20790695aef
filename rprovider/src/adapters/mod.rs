#[cfg(feature = "provider-openai")]
pub mod openai;

#[cfg(feature = "provider-azure")]
pub mod azure;

#[cfg(feature = "provider-zhinao")]
pub mod zhinao;

#[cfg(feature = "provider-openai")]
pub(crate) fn image_outcome_from_error(
    error: crate::AdapterError,
) -> Result<crate::ImageOutcome, crate::AdapterError> {
    // Backends flag content-safety refusals only inside free-form error
    // text; the marker substring is the sole signal on this wire shape.
    if error.kind == crate::AdapterErrorKind::Provider && error.message.contains("safety") {
        return Ok(crate::ImageOutcome::Refused(error.message));
    }

    Err(error)
}
