//! State preview image command

use crate::protocol::containers::ImageContainer;
use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use std::fmt;

/// Rendered previews of instances, one image per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePreviewImageChangedCommand {
    images: Vec<ImageContainer>,
}

impl StatePreviewImageChangedCommand {
    pub fn new(images: Vec<ImageContainer>) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &[ImageContainer] {
        &self.images
    }

    pub fn into_images(self) -> Vec<ImageContainer> {
        self.images
    }

    /// Orders entries by instance id, then by image bytes
    pub fn sort(&mut self) {
        self.images.sort_by(|a, b| {
            a.instance_id()
                .cmp(&b.instance_id())
                .then_with(|| a.image().cmp(b.image()))
        });
    }
}

impl WireFormat for StatePreviewImageChangedCommand {
    const NAME: &'static str = "StatePreviewImageChanged";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_seq(&self.images);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            images: input.get_seq("images")?,
        })
    }
}

impl fmt::Display for StatePreviewImageChangedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatePreviewImageChangedCommand(")?;
        for (index, image) in self.images.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {} bytes", image.instance_id(), image.image().len())?;
        }
        write!(f, ")")
    }
}
