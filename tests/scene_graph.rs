use std::sync::Arc;

use egui::{Color32, Pos2, Vec2};
use garment_studio::render::text::FontBook;
use garment_studio::scene::object::{FontWeight, GarmentLayer, ImageLayer, ObjectKind, TextLayer};
use garment_studio::scene::transform::{Transform, TransformDelta};
use garment_studio::scene::{AddOptions, RasterOptions};
use garment_studio::{MemoryAssets, SceneError, SceneGraph, SceneObject, SceneSnapshot, Viewport};
use image::{Rgba, RgbaImage};

const GARMENT: &str = "tshirt.png";

/// 10x10 shirt: opaque white on the left, half-transparent white on the right.
fn garment_raster() -> RgbaImage {
    RgbaImage::from_fn(10, 10, |x, _| {
        if x < 5 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([255, 255, 255, 128])
        }
    })
}

fn assets() -> MemoryAssets {
    MemoryAssets::new().with(GARMENT, garment_raster())
}

fn garment(color: Color32) -> SceneObject {
    let layer = GarmentLayer::new(GARMENT, Arc::new(garment_raster()), color);
    SceneObject::garment(layer, Transform::identity())
}

fn logo(size: u32, pixel: [u8; 4]) -> SceneObject {
    SceneObject::image(
        ImageLayer::new(RgbaImage::from_pixel(size, size, Rgba(pixel))),
        Transform::identity(),
    )
}

fn label() -> SceneObject {
    SceneObject::text(TextLayer {
        content: "SARIONYX".to_owned(),
        font_family: "Arial".to_owned(),
        font_size: 4.0,
        weight: FontWeight::Bold,
        fill: Color32::from_rgb(0x33, 0x33, 0x33),
    })
}

fn transparent_scene(size: f32) -> SceneGraph {
    SceneGraph::new(Viewport::square(size).with_background(None))
}

#[test]
fn garment_stays_single_and_at_the_back() {
    let mut scene = transparent_scene(10.0);
    let mut added = Vec::new();
    for step in 0..12 {
        match step % 4 {
            0 => {
                let id = scene.add_object(logo(2, [0, 0, 255, 255]), AddOptions::default());
                added.push(id.unwrap());
            }
            1 => added.push(scene.add_object(label(), AddOptions::CENTERED).unwrap()),
            2 => {
                let first = added.remove(0);
                assert!(scene.remove_object(first).is_some());
            }
            _ => {
                let result = scene.add_object(garment(Color32::RED), AddOptions::CENTERED);
                if step == 3 {
                    result.unwrap();
                } else {
                    assert!(matches!(result, Err(SceneError::InvariantViolation(_))));
                }
            }
        }

        let garments = scene.objects().iter().filter(|object| object.is_garment()).count();
        assert!(garments <= 1);
        if garments == 1 {
            assert!(scene.objects()[0].is_garment());
            assert_eq!(scene.objects()[0].z_order(), 0);
        }
        for (rank, object) in scene.objects().iter().enumerate() {
            assert_eq!(object.z_order() as usize, rank);
        }
        scene.check_invariants().unwrap();
    }
}

#[test]
fn removing_unknown_or_locked_objects_is_a_no_op() {
    let mut scene = transparent_scene(10.0);
    let garment_id = scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    let revision = scene.revision();

    assert!(scene.remove_object(garment_id).is_none());
    assert!(scene.remove_object(garment_studio::ObjectId::new()).is_none());
    assert_eq!(scene.len(), 1);
    assert_eq!(scene.revision(), revision);
}

#[test]
fn selection_only_accepts_selectable_objects() {
    let mut scene = transparent_scene(10.0);
    let garment_id = scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    let logo_id = scene.add_object(logo(2, [0, 0, 0, 255]), AddOptions::CENTERED).unwrap();

    assert!(scene.set_selection(Some(logo_id)));
    assert!(!scene.set_selection(Some(garment_id)));
    assert_eq!(scene.selection(), Some(logo_id));

    scene.remove_object(logo_id);
    assert_eq!(scene.selection(), None);
}

#[test]
fn locked_garment_ignores_transforms() {
    let mut scene = transparent_scene(10.0);
    let garment_id = scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    let before = *scene.get(garment_id).unwrap().transform();

    assert!(!scene.transform(garment_id, TransformDelta::translate(Vec2::new(3.0, 0.0))));
    assert_eq!(*scene.get(garment_id).unwrap().transform(), before);
}

#[test]
fn reorder_never_reaches_below_the_garment() {
    let mut scene = transparent_scene(10.0);
    scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    let a = scene.add_object(logo(2, [0, 0, 0, 255]), AddOptions::CENTERED).unwrap();
    let b = scene.add_object(logo(2, [255, 255, 255, 255]), AddOptions::CENTERED).unwrap();

    assert!(scene.reorder(b, 0));
    assert!(scene.objects()[0].is_garment());
    assert_eq!(scene.get(b).unwrap().z_order(), 1);
    assert_eq!(scene.get(a).unwrap().z_order(), 2);

    assert!(scene.reorder(b, 10));
    assert_eq!(scene.get(b).unwrap().z_order(), 2);
}

#[test]
fn hit_test_finds_the_topmost_selectable_object() {
    let mut scene = transparent_scene(20.0);
    scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    let below = scene.add_object(logo(6, [0, 0, 0, 255]), AddOptions::CENTERED).unwrap();
    let above = scene.add_object(logo(2, [0, 0, 0, 255]), AddOptions::CENTERED).unwrap();

    assert_eq!(scene.hit_test(Pos2::new(10.0, 10.0)), Some(above));
    assert_eq!(scene.hit_test(Pos2::new(8.0, 8.0)), Some(below));
    // Only the locked garment is here
    assert_eq!(scene.hit_test(Pos2::new(14.0, 14.0)), None);
}

#[test]
fn hit_test_honors_rotation() {
    let mut scene = transparent_scene(20.0);
    let bar = SceneObject::image(
        ImageLayer::new(RgbaImage::from_pixel(10, 2, Rgba([0, 0, 0, 255]))),
        Transform::identity(),
    );
    let id = scene.add_object(bar, AddOptions::CENTERED).unwrap();

    assert_eq!(scene.hit_test(Pos2::new(14.0, 10.0)), Some(id));
    assert_eq!(scene.hit_test(Pos2::new(10.0, 14.0)), None);

    scene.transform(id, TransformDelta::rotate_by(std::f32::consts::FRAC_PI_2));
    assert_eq!(scene.hit_test(Pos2::new(14.0, 10.0)), None);
    assert_eq!(scene.hit_test(Pos2::new(10.0, 14.0)), Some(id));
}

#[test]
fn recolored_garment_is_tinted_and_keeps_alpha() {
    let mut scene = transparent_scene(10.0);
    scene.add_object(garment(Color32::WHITE), AddOptions::CENTERED).unwrap();
    assert!(scene.recolor_garment(Color32::from_rgb(0xff, 0x00, 0x00)));

    let raster = scene.to_raster(RasterOptions::default());
    assert_eq!(raster.dimensions(), (10, 10));
    assert_eq!(*raster.get_pixel(2, 5), Rgba([255, 0, 0, 255]));
    assert_eq!(*raster.get_pixel(7, 5), Rgba([255, 0, 0, 128]));
    assert_eq!(scene.current_color(), Some(Color32::RED));
}

#[test]
fn recolor_without_garment_is_a_no_op() {
    let mut scene = transparent_scene(10.0);
    assert!(!scene.recolor_garment(Color32::BLUE));
    assert_eq!(scene.current_color(), None);
    assert_eq!(scene.revision(), 0);
}

#[test]
fn recolor_is_idempotent() {
    let mut once = SceneGraph::new(Viewport::square(10.0));
    once.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    once.recolor_garment(Color32::from_rgb(0, 128, 255));

    let mut twice = SceneGraph::new(Viewport::square(10.0));
    twice.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    twice.recolor_garment(Color32::from_rgb(0, 128, 255));
    twice.recolor_garment(Color32::from_rgb(0, 128, 255));

    assert_eq!(once.to_raster(RasterOptions::default()), twice.to_raster(RasterOptions::default()));
}

#[test]
fn snapshot_round_trip_renders_identically() {
    let mut scene = SceneGraph::new(Viewport::square(40.0));
    scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    scene.recolor_garment(Color32::from_rgb(20, 160, 90));
    let text = scene.add_object(label(), AddOptions::CENTERED).unwrap();
    scene.transform(text, TransformDelta::rotate_by(0.3));
    let badge = scene.add_object(logo(5, [200, 40, 40, 200]), AddOptions::CENTERED).unwrap();
    scene.transform(badge, TransformDelta::translate(Vec2::new(7.5, -3.25)));
    scene.transform(badge, TransformDelta::scale_by(1.7));

    let json = serde_json::to_string(&scene.serialize()).unwrap();
    let snapshot: SceneSnapshot = serde_json::from_str(&json).unwrap();
    let (restored, asset_error) =
        SceneGraph::deserialize(&snapshot, &assets(), FontBook::shared()).unwrap();
    assert!(asset_error.is_none());

    assert_eq!(restored.serialize(), scene.serialize());
    for multiplier in [1.0, 2.0] {
        let options = RasterOptions {
            scale_multiplier: multiplier,
        };
        assert_eq!(restored.to_raster(options), scene.to_raster(options));
    }
    assert!(matches!(restored.get(text).unwrap().kind(), ObjectKind::Text(_)));
}

#[test]
fn garment_color_is_recorded_once() {
    let mut scene = transparent_scene(10.0);
    scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    scene.recolor_garment(Color32::from_rgb(4, 5, 6));

    let snapshot = scene.serialize();
    let json = snapshot.to_json().unwrap();
    assert!(json.get("garment_color").is_none());
    assert_eq!(json["objects"][0]["payload"]["color"], serde_json::json!([4, 5, 6, 255]));
    assert_eq!(snapshot.garment_color(), Some(Color32::from_rgb(4, 5, 6)));
    assert_eq!(transparent_scene(10.0).serialize().garment_color(), None);
}

#[test]
fn snapshots_breaking_invariants_are_rejected() {
    let mut scene = transparent_scene(10.0);
    scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    scene.add_object(logo(2, [0, 0, 0, 255]), AddOptions::CENTERED).unwrap();

    let mut swapped = scene.serialize();
    swapped.objects.swap(0, 1);
    for (rank, object) in swapped.objects.iter_mut().enumerate() {
        object.z_order = rank as u32;
    }
    assert!(matches!(
        SceneGraph::deserialize(&swapped, &assets(), FontBook::shared()),
        Err(SceneError::InvariantViolation(_))
    ));

    let mut future = scene.serialize();
    future.version += 1;
    assert!(matches!(
        SceneGraph::deserialize(&future, &assets(), FontBook::shared()),
        Err(SceneError::UnsupportedSnapshot { .. })
    ));
}

#[test]
fn missing_garment_artwork_keeps_the_other_layers() {
    let mut scene = transparent_scene(10.0);
    scene.add_object(garment(Color32::RED), AddOptions::CENTERED).unwrap();
    let text = scene.add_object(label(), AddOptions::CENTERED).unwrap();
    let badge = scene.add_object(logo(2, [0, 0, 0, 255]), AddOptions::CENTERED).unwrap();

    let (restored, asset_error) =
        SceneGraph::deserialize(&scene.serialize(), &MemoryAssets::new(), FontBook::shared())
            .unwrap();

    assert!(matches!(asset_error, Some(garment_studio::AssetLoadError::Missing(_))));
    assert!(restored.garment().is_none());
    assert_eq!(restored.len(), 2);
    assert!(matches!(restored.get(text).unwrap().kind(), ObjectKind::Text(_)));
    assert!(matches!(restored.get(badge).unwrap().kind(), ObjectKind::Image(_)));
    assert_eq!(restored.get(text).unwrap().z_order(), 0);
    assert_eq!(restored.get(badge).unwrap().z_order(), 1);
    restored.check_invariants().unwrap();
}
