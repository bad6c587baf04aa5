/**
 * SECTION:element-exclusion
 *
 * Exclusion saturates the colors of a video stream in realtime.
 *
 * ## Example launch line
 * ```
 * gst-launch-1.0 videotestsrc ! video/x-raw,format=BGRx ! exclusion ! videoconvert ! autovideosink
 * ```
 */
use gst::glib;
use gst::prelude::*;

mod imp;
pub mod kernel;

glib::wrapper! {
    pub struct Exclusion(ObjectSubclass<imp::Exclusion>)
        @extends gst_base::BaseTransform, gst::Element, gst::Object;
}

pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "exclusion",
        gst::Rank::NONE,
        Exclusion::static_type(),
    )
}
