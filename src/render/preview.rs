use image::RgbaImage;

use crate::scene::{RasterOptions, SceneGraph};

/// On-screen render of the scene, redone only when the scene changed.
///
/// Any number of mutations between two frames collapse into a single
/// render. `refresh` takes `&mut self` and renders synchronously, so a second
/// render can never start while one is running.
#[derive(Debug, Default)]
pub struct PreviewCache {
    rendered: Option<RenderKey>,
    image: Option<RgbaImage>,
    render_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RenderKey {
    revision: u64,
    pixel_ratio: f32,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, scene: &SceneGraph, pixel_ratio: f32) -> bool {
        self.rendered != Some(RenderKey {
            revision: scene.revision(),
            pixel_ratio,
        })
    }

    /// Renders when stale. Returns the fresh image only if a render happened.
    pub fn refresh(&mut self, scene: &SceneGraph, pixel_ratio: f32) -> Option<&RgbaImage> {
        if !self.is_stale(scene, pixel_ratio) {
            return None;
        }

        let image = scene.to_raster(RasterOptions {
            scale_multiplier: pixel_ratio,
        });

        self.rendered = Some(RenderKey {
            revision: scene.revision(),
            pixel_ratio,
        });
        self.render_count += 1;
        log::debug!(
            "Rendered preview r{} at {}x{}",
            scene.revision(),
            image.width(),
            image.height()
        );
        self.image = Some(image);
        self.image.as_ref()
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Forces the next refresh to render, e.g. after swapping in a new scene.
    pub fn invalidate(&mut self) {
        self.rendered = None;
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Viewport;
    use crate::scene::object::{ImageLayer, SceneObject};
    use crate::scene::transform::Transform;
    use crate::scene::AddOptions;
    use image::Rgba;

    fn dot() -> SceneObject {
        let raster = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        SceneObject::image(ImageLayer::new(raster), Transform::identity())
    }

    #[test]
    fn mutations_between_frames_coalesce_into_one_render() {
        let mut scene = SceneGraph::new(Viewport::square(16.0));
        let mut cache = PreviewCache::new();
        assert!(cache.refresh(&scene, 1.0).is_some());

        scene.add_object(dot(), AddOptions::CENTERED).unwrap();
        scene.add_object(dot(), AddOptions::CENTERED).unwrap();
        assert!(cache.refresh(&scene, 1.0).is_some());
        assert!(cache.refresh(&scene, 1.0).is_none());
        assert_eq!(cache.render_count(), 2);
    }

    #[test]
    fn every_stale_refresh_renders() {
        let mut scene = SceneGraph::new(Viewport::square(8.0));
        let mut cache = PreviewCache::new();
        for expected in 1..=3 {
            scene.add_object(dot(), AddOptions::CENTERED).unwrap();
            assert!(cache.is_stale(&scene, 1.0));
            assert!(cache.refresh(&scene, 1.0).is_some());
            assert!(!cache.is_stale(&scene, 1.0));
            assert_eq!(cache.render_count(), expected);
        }
    }

    #[test]
    fn pixel_ratio_change_triggers_render() {
        let scene = SceneGraph::new(Viewport::square(16.0));
        let mut cache = PreviewCache::new();
        cache.refresh(&scene, 1.0);
        let image = cache.refresh(&scene, 2.0).unwrap();
        assert_eq!(image.width(), 32);
    }

    #[test]
    fn invalidate_forces_render() {
        let scene = SceneGraph::new(Viewport::square(8.0));
        let mut cache = PreviewCache::new();
        cache.refresh(&scene, 1.0);
        cache.invalidate();
        assert!(cache.refresh(&scene, 1.0).is_some());
    }
}
