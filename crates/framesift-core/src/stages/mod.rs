mod crop;
mod decode;
mod quality;
mod render;
mod save;

use crate::context::{ProcessingContext, Stage, StageError};
use crate::error::Result;

/// Run the stage sequence for one frame on the calling (worker) thread.
///
/// Failures never propagate: a failing stage records itself on the
/// context and the remaining stages are skipped. `only_render` contexts
/// take the Decode + Render shortcut used for idle previews.
pub fn process(mut ctx: Box<ProcessingContext>) -> Box<ProcessingContext> {
    if ctx.only_render {
        if run_stage(&mut ctx, Stage::Decode, decode::run) {
            run_stage(&mut ctx, Stage::Render, render::run);
        }
        return ctx;
    }

    if !run_stage(&mut ctx, Stage::Decode, decode::run) {
        return ctx;
    }
    if ctx.do_render && !run_stage(&mut ctx, Stage::Render, render::run) {
        return ctx;
    }
    if !run_stage(&mut ctx, Stage::Crop, crop::run) {
        return ctx;
    }
    if ctx.settings.estimate_quality
        && !run_stage(&mut ctx, Stage::EstimateQuality, quality::run)
    {
        return ctx;
    }
    run_stage(&mut ctx, Stage::Save, save::run);
    ctx
}

/// Each stage appends its tag on entry, so on failure the last entry of
/// `completed_stages` names the failure site.
fn run_stage(
    ctx: &mut ProcessingContext,
    stage: Stage,
    run: fn(&mut ProcessingContext) -> Result<()>,
) -> bool {
    ctx.completed_stages.push(stage);
    match run(ctx) {
        Ok(()) => {
            ctx.stage_success = true;
            true
        }
        Err(e) => {
            ctx.stage_success = false;
            ctx.error = Some(StageError {
                stage,
                message: e.to_string(),
            });
            false
        }
    }
}
