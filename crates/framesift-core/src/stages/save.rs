use crate::context::ProcessingContext;
use crate::error::{Result, SiftError};
use crate::io::{filename, image_io};
use crate::settings::QualityFilterType;

/// Compute the canonical filename, decide acceptance, and write the
/// cropped frame when the active filter calls for an immediate save.
/// Acceptance-rate filtering defers the write to the coordinator but
/// deep-copies the cropped region here, so pool reuse of this context
/// cannot race with the deferred save.
pub(super) fn run(ctx: &mut ProcessingContext) -> Result<()> {
    let settings = ctx.settings.clone();
    let metadata = ctx
        .raw_frame
        .as_ref()
        .map(|f| f.metadata)
        .ok_or_else(|| SiftError::Pipeline("save before decode".into()))?;
    ctx.filename =
        filename::save_filename(&settings.save_images_directory, &metadata, ctx.quality);

    let decoded = ctx
        .decoded
        .as_ref()
        .ok_or_else(|| SiftError::Pipeline("save before decode".into()))?;

    if settings.save_images && settings.filter_type == QualityFilterType::AcceptanceRate {
        let spare = ctx.cloned.take();
        ctx.cloned = Some(decoded.crop_reusing(&ctx.crop_area, spare));
    }

    ctx.accepted = f64::from(ctx.quality) >= settings.minimum_quality;
    let do_save = settings.save_images
        && match settings.filter_type {
            QualityFilterType::None => true,
            QualityFilterType::MinimumQuality => ctx.accepted,
            QualityFilterType::AcceptanceRate => false,
        };

    if do_save {
        let cropped = decoded.crop(&ctx.crop_area);
        image_io::write_image_atomic(&cropped, &ctx.filename)?;
    }
    Ok(())
}
