//! Integration tests for asset loading.

use std::io::Write;
use std::path::PathBuf;

use viewer_resources::{Model, TextureData};

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("viewer-it-{}-{}", std::process::id(), name));
    path
}

#[test]
fn test_load_quad_obj_with_texture() {
    // A textured quad: two triangles, four corners, full UV range
    let obj_path = temp_path("quad.obj");
    let mut file = std::fs::File::create(&obj_path).unwrap();
    file.write_all(
        b"v -1.0 -1.0 0.0\n\
          v 1.0 -1.0 0.0\n\
          v 1.0 1.0 0.0\n\
          v -1.0 1.0 0.0\n\
          vt 0.0 0.0\n\
          vt 1.0 0.0\n\
          vt 1.0 1.0\n\
          vt 0.0 1.0\n\
          f 1/1 2/2 3/3\n\
          f 3/3 4/4 1/1\n",
    )
    .unwrap();

    let model = Model::load(&obj_path).expect("Failed to load OBJ quad");
    std::fs::remove_file(&obj_path).ok();

    // Two triangles, six face-vertices in face order, sequential indices
    assert_eq!(model.triangle_count(), 2);
    assert_eq!(model.vertices.len(), 6);
    assert_eq!(model.indices, vec![0, 1, 2, 3, 4, 5]);

    // The shared corner appears once per face it participates in
    assert_eq!(model.vertices[2].position, model.vertices[3].position);

    // UVs are V-flipped into Vulkan's convention
    assert_eq!(model.vertices[0].tex_coord, [0.0, 1.0]);
    assert_eq!(model.vertices[2].tex_coord, [1.0, 0.0]);

    // Decode a small texture alongside, as the renderer does at startup
    let tex_path = temp_path("tex.png");
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([200, 100, 50, 255]));
    img.save(&tex_path).unwrap();

    let texture = TextureData::load(&tex_path).expect("Failed to decode texture");
    std::fs::remove_file(&tex_path).ok();

    assert_eq!((texture.width, texture.height), (8, 8));
    assert_eq!(texture.byte_size(), 8 * 8 * 4);
    assert_eq!(&texture.pixels[0..4], &[200, 100, 50, 255]);
}

#[test]
fn test_untextured_obj_defaults_uvs_to_zero() {
    let obj_path = temp_path("plain.obj");
    let mut file = std::fs::File::create(&obj_path).unwrap();
    file.write_all(
        b"v 0.0 0.0 0.0\n\
          v 1.0 0.0 0.0\n\
          v 0.0 1.0 0.0\n\
          f 1 2 3\n",
    )
    .unwrap();

    let model = Model::load(&obj_path).expect("Failed to load OBJ triangle");
    std::fs::remove_file(&obj_path).ok();

    assert_eq!(model.vertices.len(), 3);
    for vertex in &model.vertices {
        assert_eq!(vertex.tex_coord, [0.0, 0.0]);
    }
}
