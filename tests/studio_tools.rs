use std::io::Cursor;

use egui::{Color32, Pos2, Vec2};
use garment_studio::scene::object::ObjectKind;
use garment_studio::scene::transform::TransformDelta;
use garment_studio::{Command, MemoryAssets, Outcome, Studio, StudioConfig, ToolError};
use image::{ImageFormat, Rgba, RgbaImage};

fn config() -> StudioConfig {
    StudioConfig {
        viewport_size: 50.0,
        ..StudioConfig::default()
    }
}

fn assets(config: &StudioConfig) -> MemoryAssets {
    MemoryAssets::new().with(
        config.garment_asset.clone(),
        RgbaImage::from_pixel(100, 120, Rgba([255, 255, 255, 255])),
    )
}

fn open() -> Studio {
    let config = config();
    let (studio, error) = Studio::open(&config, &assets(&config));
    assert!(error.is_none());
    studio
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let raster = RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 255]));
    let mut bytes = Cursor::new(Vec::new());
    raster.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[test]
fn opening_places_a_recolored_garment() {
    let studio = open();
    let scene = studio.scene();
    assert_eq!(scene.len(), 1);

    let garment = scene.garment().unwrap();
    assert_eq!(garment.transform().position, Vec2::new(25.0, 25.0));
    assert!((garment.transform().scale.x - 0.4).abs() < 1e-6);
    assert_eq!(scene.current_color(), Some(Color32::from_rgb(0xff, 0, 0)));
}

#[test]
fn missing_garment_leaves_an_empty_usable_studio() {
    let (mut studio, error) = Studio::open(&config(), &MemoryAssets::new());
    assert!(error.is_some());
    assert!(studio.scene().is_empty());
    assert!(!studio.recolor(Color32::BLUE));
    assert!(studio.add_text().is_ok());
}

#[test]
fn recolor_applies_last_write() {
    let mut studio = open();
    assert!(studio.recolor(Color32::from_rgb(0, 0, 255)));
    assert!(studio.recolor(Color32::from_rgb(0, 255, 0)));
    assert!(!studio.recolor(Color32::from_rgb(0, 255, 0)));
    assert_eq!(studio.scene().current_color(), Some(Color32::from_rgb(0, 255, 0)));
}

#[test]
fn add_text_then_delete_leaves_only_the_garment() {
    let mut studio = open();
    let id = studio.add_text().unwrap();
    assert_eq!(studio.selection(), Some(id));

    let text = studio.scene().get(id).unwrap().as_text().unwrap();
    assert_eq!(text.content, "SARIONYX");
    assert_eq!(text.font_family, "Arial");
    assert!((text.font_size - 4.0).abs() < 1e-6);

    assert_eq!(studio.delete_selected(), Some(id));
    assert_eq!(studio.scene().len(), 1);
    assert!(studio.scene().objects()[0].is_garment());
    assert_eq!(studio.selection(), None);
}

#[test]
fn invalid_upload_is_rejected_without_changes() {
    let mut studio = open();
    let revision = studio.scene().revision();

    let result = studio.upload_image(b"definitely not an image");
    assert!(matches!(result, Err(ToolError::Decode(_))));
    assert_eq!(studio.scene().len(), 1);
    assert_eq!(studio.scene().revision(), revision);
}

#[test]
fn upload_is_bounded_centered_and_selected() {
    let mut studio = open();
    let id = studio.upload_image(&png(40, 20)).unwrap();

    let object = studio.scene().get(id).unwrap();
    assert_eq!(studio.selection(), Some(id));
    assert_eq!(object.transform().position, Vec2::new(25.0, 25.0));
    // Longest edge becomes 0.3 of the viewport
    assert!((object.transform().scale.x - 0.375).abs() < 1e-6);
    match object.kind() {
        ObjectKind::Image(image) => assert_eq!(image.raster().dimensions(), (40, 20)),
        other => panic!("expected an image, got {other:?}"),
    }
}

#[test]
fn oversized_uploads_are_downsampled() {
    let config = StudioConfig {
        upload_max_pixels: 16,
        ..config()
    };
    let (mut studio, _) = Studio::open(&config, &assets(&config));
    let id = studio.upload_image(&png(40, 20)).unwrap();

    match studio.scene().get(id).unwrap().kind() {
        ObjectKind::Image(image) => assert_eq!(image.raster().dimensions(), (16, 8)),
        other => panic!("expected an image, got {other:?}"),
    }
}

#[test]
fn delete_with_nothing_selected_is_a_no_op() {
    let mut studio = open();
    studio.add_text().unwrap();
    studio.select(None);

    assert_eq!(studio.delete_selected(), None);
    assert_eq!(studio.scene().len(), 2);
}

#[test]
fn commands_drive_the_studio() {
    let mut studio = open();

    let Outcome::Added(text) = Command::AddText.execute(&mut studio).unwrap() else {
        panic!("text was not added");
    };
    let Outcome::Added(logo) = Command::UploadImage(png(8, 8)).execute(&mut studio).unwrap() else {
        panic!("logo was not added");
    };
    assert_eq!(studio.selection(), Some(logo));

    let moved = Command::TransformSelected(TransformDelta::translate(Vec2::new(5.0, 0.0)));
    assert_eq!(moved.execute(&mut studio).unwrap(), Outcome::Changed);
    assert_eq!(studio.scene().get(logo).unwrap().transform().position, Vec2::new(30.0, 25.0));

    assert_eq!(Command::SendBackward.execute(&mut studio).unwrap(), Outcome::Changed);
    assert_eq!(studio.scene().get(logo).unwrap().z_order(), 1);
    // The garment holds rank 0
    assert_eq!(Command::SendBackward.execute(&mut studio).unwrap(), Outcome::Unchanged);
    assert_eq!(Command::BringForward.execute(&mut studio).unwrap(), Outcome::Changed);
    assert_eq!(studio.scene().get(text).unwrap().z_order(), 1);

    assert_eq!(
        Command::SelectAt(Pos2::new(30.0, 25.0)).execute(&mut studio).unwrap(),
        Outcome::Unchanged
    );
    assert_eq!(Command::DeleteSelected.execute(&mut studio).unwrap(), Outcome::Removed(logo));
    assert_eq!(Command::Select(None).execute(&mut studio).unwrap(), Outcome::Unchanged);
}

#[test]
fn reopening_restores_the_design() {
    let config = config();
    let mut studio = open();
    studio.recolor(Color32::from_rgb(1, 2, 3));
    studio.add_text().unwrap();

    let snapshot = studio.scene().serialize();
    let (reopened, asset_error) = Studio::reopen(&config, &snapshot, &assets(&config)).unwrap();
    assert!(asset_error.is_none());
    assert_eq!(reopened.scene().serialize(), snapshot);
    assert_eq!(reopened.selection(), None);
}

#[test]
fn reopening_without_garment_artwork_keeps_the_design() {
    let config = config();
    let mut studio = open();
    let text = studio.add_text().unwrap();
    let logo = studio.upload_image(&png(8, 8)).unwrap();

    let snapshot = studio.scene().serialize();
    let (mut reopened, asset_error) =
        Studio::reopen(&config, &snapshot, &MemoryAssets::new()).unwrap();
    assert!(asset_error.is_some());
    assert!(reopened.scene().garment().is_none());
    assert!(reopened.scene().get(text).is_some());
    assert!(reopened.scene().get(logo).is_some());

    // The rest of the design stays editable
    assert!(!reopened.recolor(Color32::BLUE));
    reopened.select(Some(logo));
    assert_eq!(reopened.delete_selected(), Some(logo));
    assert_eq!(reopened.scene().len(), 1);
}
