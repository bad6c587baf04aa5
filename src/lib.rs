#![allow(clippy::non_send_fields_in_send_ty, unused_doc_comments)]

/**
 * plugin-rsexclusion:
 *
 * Color exclusion video effect, after Pete Warden's FreeFrame plugin.
 */
use gst::glib;

mod exclusion;

pub use exclusion::kernel::{
    EXCLUSION_FACTOR, FrameError, PixelLayout, PixelTransformer, exclude_pixel, gate_int,
};

fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    exclusion::register(plugin)
}

gst::plugin_define!(
    rsexclusion,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("COMMIT_ID")),
    "LGPL",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    env!("BUILD_REL_DATE")
);
