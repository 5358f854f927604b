use crate::context::ProcessingContext;
use crate::error::{Result, SiftError};
use crate::pixels;

/// Decode the raw frame into the native matrix, its float planes and a
/// grayscale plane. A decoder error is fatal for this frame only.
pub(super) fn run(ctx: &mut ProcessingContext) -> Result<()> {
    let decoder = ctx
        .decoder
        .as_mut()
        .ok_or_else(|| SiftError::Pipeline("context has no decoder".into()))?;
    let raw = ctx
        .raw_frame
        .as_ref()
        .ok_or_else(|| SiftError::Pipeline("context has no raw frame".into()))?;

    let mut decoded = decoder.decode(raw)?;
    if ctx.settings.negative {
        decoded.invert();
    }
    ctx.decoded_float = decoded.to_float_planes();
    ctx.grayscale = pixels::grayscale(&ctx.decoded_float);
    ctx.decoded = Some(decoded);
    Ok(())
}
