use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;
use gst_base::subclass::prelude::*;
use gst_video::VideoFrameExt;
use gst_video::VideoFrameRef;
use std::sync::LazyLock;
use std::sync::Mutex;

use super::kernel::{FrameError, PixelLayout, PixelTransformer};

static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "exclusion",
        gst::DebugColorFlags::empty(),
        Some("Color exclusion video effect"),
    )
});

const DEFAULT_SILENT: bool = false;

const FORMATS: [gst_video::VideoFormat; 4] = [
    gst_video::VideoFormat::Bgrx,
    gst_video::VideoFormat::Rgbx,
    gst_video::VideoFormat::Xrgb,
    gst_video::VideoFormat::Xbgr,
];

#[derive(Debug, Clone, Copy)]
struct Settings {
    silent: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            silent: DEFAULT_SILENT,
        }
    }
}

struct State {
    info: gst_video::VideoInfo,
    transformer: PixelTransformer,
}

#[derive(Default)]
pub struct Exclusion {
    settings: Mutex<Settings>,
    state: Mutex<Option<State>>,
}

fn layout_for(format: gst_video::VideoFormat) -> Option<PixelLayout> {
    match format {
        gst_video::VideoFormat::Bgrx => Some(PixelLayout::Bgrx),
        gst_video::VideoFormat::Rgbx => Some(PixelLayout::Rgbx),
        gst_video::VideoFormat::Xrgb => Some(PixelLayout::Xrgb),
        gst_video::VideoFormat::Xbgr => Some(PixelLayout::Xbgr),
        _ => None,
    }
}

#[glib::object_subclass]
impl ObjectSubclass for Exclusion {
    const NAME: &'static str = "GstRsExclusion";
    type Type = super::Exclusion;
    type ParentType = gst_base::BaseTransform;
}

impl ObjectImpl for Exclusion {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: LazyLock<Vec<glib::ParamSpec>> = LazyLock::new(|| {
            vec![
                glib::ParamSpecBoolean::builder("silent")
                    .nick("Silent")
                    .blurb("Produce verbose output ?")
                    .default_value(DEFAULT_SILENT)
                    .mutable_playing()
                    .build(),
            ]
        });

        PROPERTIES.as_ref()
    }

    fn set_property(&self, _id: usize, value: &glib::Value, pspec: &glib::ParamSpec) {
        match pspec.name() {
            "silent" => {
                let mut settings = self.settings.lock().unwrap();
                let silent = value.get().expect("type checked upstream");
                gst::info!(
                    CAT,
                    imp = self,
                    "Changing silent from {} to {}",
                    settings.silent,
                    silent
                );
                settings.silent = silent;
            }
            _ => unimplemented!(),
        }
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        match pspec.name() {
            "silent" => self.settings.lock().unwrap().silent.to_value(),
            _ => unimplemented!(),
        }
    }
}

impl GstObjectImpl for Exclusion {}

impl ElementImpl for Exclusion {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> = LazyLock::new(|| {
            gst::subclass::ElementMetadata::new(
                "Exclusion",
                "Filter/Effect/Video",
                "Exclusion excludes the colors in the video signal",
                "Eric Bridgeford",
            )
        });
        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gst::PadTemplate] {
        static PAD_TEMPLATES: LazyLock<Vec<gst::PadTemplate>> = LazyLock::new(|| {
            let caps = gst_video::VideoCapsBuilder::new()
                .format_list(FORMATS)
                .build();

            let src_pad_template = gst::PadTemplate::new(
                "src",
                gst::PadDirection::Src,
                gst::PadPresence::Always,
                &caps,
            )
            .unwrap();

            let sink_pad_template = gst::PadTemplate::new(
                "sink",
                gst::PadDirection::Sink,
                gst::PadPresence::Always,
                &caps,
            )
            .unwrap();

            vec![src_pad_template, sink_pad_template]
        });

        PAD_TEMPLATES.as_ref()
    }
}

impl BaseTransformImpl for Exclusion {
    const MODE: gst_base::subclass::BaseTransformMode =
        gst_base::subclass::BaseTransformMode::NeverInPlace;
    const PASSTHROUGH_ON_SAME_CAPS: bool = false;
    const TRANSFORM_IP_ON_PASSTHROUGH: bool = false;

    fn unit_size(&self, caps: &gst::Caps) -> Option<usize> {
        match gst_video::VideoInfo::from_caps(caps) {
            Ok(info) => Some(info.size()),
            Err(_) => {
                gst::warning!(CAT, imp = self, "unit_size: could not parse {}", caps);
                None
            }
        }
    }

    fn set_caps(&self, incaps: &gst::Caps, outcaps: &gst::Caps) -> Result<(), gst::LoggableError> {
        gst::info!(CAT, imp = self, "Input caps: {}", incaps);
        gst::info!(CAT, imp = self, "Output caps: {}", outcaps);

        let in_info = gst_video::VideoInfo::from_caps(incaps)
            .map_err(|_| gst::loggable_error!(CAT, "Failed to parse input caps"))?;
        let out_info = gst_video::VideoInfo::from_caps(outcaps)
            .map_err(|_| gst::loggable_error!(CAT, "Failed to parse output caps"))?;

        if in_info.format() != out_info.format()
            || in_info.width() != out_info.width()
            || in_info.height() != out_info.height()
        {
            return Err(gst::loggable_error!(
                CAT,
                "Input and output caps must describe the same frames"
            ));
        }

        let layout = layout_for(in_info.format()).ok_or_else(|| {
            gst::loggable_error!(CAT, "Unsupported format {:?}", in_info.format())
        })?;

        let width = in_info.width() as usize;
        let height = in_info.height() as usize;

        let mut state_guard = self.state.lock().unwrap();
        match state_guard.as_mut() {
            Some(state) => {
                state.transformer.configure(width, height, layout);
                state.info = in_info;
            }
            None => {
                *state_guard = Some(State {
                    info: in_info,
                    transformer: PixelTransformer::new(width, height, layout),
                });
            }
        }

        gst::info!(
            CAT,
            imp = self,
            "Configured {}x{} {:?}",
            width,
            height,
            layout
        );

        Ok(())
    }

    fn stop(&self) -> Result<(), gst::ErrorMessage> {
        *self.state.lock().unwrap() = None;
        gst::info!(CAT, imp = self, "Stopped");
        Ok(())
    }

    fn transform(
        &self,
        inbuf: &gst::Buffer,
        outbuf: &mut gst::BufferRef,
    ) -> Result<gst::FlowSuccess, gst::FlowError> {
        let silent = self.settings.lock().unwrap().silent;

        let state_guard = self.state.lock().unwrap();
        let state = state_guard.as_ref().ok_or(gst::FlowError::NotNegotiated)?;

        let in_frame = VideoFrameRef::from_buffer_ref_readable(inbuf.as_ref(), &state.info)
            .map_err(|_| {
                gst::element_imp_error!(
                    self,
                    gst::CoreError::Failed,
                    ["Failed to map input buffer readable"]
                );
                gst::FlowError::Error
            })?;

        let mut out_frame = VideoFrameRef::from_buffer_ref_writable(outbuf, &state.info)
            .map_err(|_| {
                gst::element_imp_error!(
                    self,
                    gst::CoreError::Failed,
                    ["Failed to map output buffer writable"]
                );
                gst::FlowError::Error
            })?;

        let in_stride = in_frame.plane_stride()[0] as usize;
        let out_stride = out_frame.plane_stride()[0] as usize;

        if !silent {
            gst::debug!(
                CAT,
                imp = self,
                "Transform: {}x{}, in_stride={}, out_stride={}",
                state.transformer.width(),
                state.transformer.height(),
                in_stride,
                out_stride,
            );
        }

        let in_data = in_frame.plane_data(0).map_err(|_| gst::FlowError::Error)?;
        let out_data = out_frame
            .plane_data_mut(0)
            .map_err(|_| gst::FlowError::Error)?;

        match state
            .transformer
            .transform_strided(in_data, in_stride, out_data, out_stride)
        {
            Ok(()) => Ok(gst::FlowSuccess::Ok),
            Err(FrameError::NotConfigured) => Err(gst::FlowError::NotNegotiated),
            Err(err) => {
                gst::element_imp_error!(
                    self,
                    gst::CoreError::Failed,
                    ["Failed to transform frame: {}", err]
                );
                Err(gst::FlowError::Error)
            }
        }
    }
}
