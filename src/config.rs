use std::path::{Path, PathBuf};

use crate::init::window::WindowDescriptor;
use crate::scene::Scene;
use crate::shader::UniformValue;

/// Location of the `media` tree holding shader sources and textures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPaths {
    root: PathBuf,
}

impl MediaPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `<current directory>/media`.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?.join("media")))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn shader_dir(&self) -> PathBuf {
        self.root.join("shaders")
    }

    #[must_use]
    pub fn texture_dir(&self) -> PathBuf {
        self.root.join("textures")
    }
}

impl Default for MediaPaths {
    fn default() -> Self {
        Self::from_current_dir().unwrap_or_else(|_| Self::new("media"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayShaders {
    pub vertex: String,
    pub fragment: String,
}

impl Default for DisplayShaders {
    fn default() -> Self {
        Self {
            vertex: "compute.vert".to_string(),
            fragment: "compute.frag".to_string(),
        }
    }
}

/// Everything a demo variant needs. Variants differ only in this value.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub window: WindowDescriptor,
    /// Size of the image written by the compute program, in pixels.
    pub output_size: [u32; 2],
    pub media: MediaPaths,
    pub display_shaders: DisplayShaders,
    pub compute_shader: String,
    /// File name under the texture directory, bound read-only at binding 1.
    pub input_texture: Option<String>,
    /// Uploaded as a storage buffer at binding 2.
    pub scene: Option<Scene>,
    /// Written into the compute program once it is linked.
    pub uniforms: Vec<(String, UniformValue)>,
}

impl DemoConfig {
    pub fn new(title: impl Into<String>, compute_shader: impl Into<String>) -> Self {
        let window = WindowDescriptor {
            title: title.into(),
            ..WindowDescriptor::default()
        };
        Self {
            output_size: [window.width, window.height],
            window,
            media: MediaPaths::default(),
            display_shaders: DisplayShaders::default(),
            compute_shader: compute_shader.into(),
            input_texture: None,
            scene: None,
            uniforms: Vec::new(),
        }
    }

    /// Sets the window size; the output image follows it.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self.output_size = [width, height];
        self
    }

    #[must_use]
    pub const fn with_output_size(mut self, width: u32, height: u32) -> Self {
        self.output_size = [width, height];
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaPaths) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_input_texture(mut self, file_name: impl Into<String>) -> Self {
        self.input_texture = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = Some(scene);
        self
    }

    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn input_texture_path(&self) -> Option<PathBuf> {
        self.input_texture
            .as_ref()
            .map(|name| self.media.texture_dir().join(name))
    }
}
