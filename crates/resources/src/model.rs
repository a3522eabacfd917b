//! Model loading from OBJ files.

use std::path::Path;

use tracing::info;

use crate::error::{ResourceError, ResourceResult};

/// A single loaded vertex record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModelVertex {
    /// Position in object space.
    pub position: [f32; 3],
    /// Texture coordinates, V flipped to match Vulkan's top-left origin.
    pub tex_coord: [f32; 2],
}

/// A loaded model: a flat vertex list and a matching index list.
///
/// Vertices are emitted in face order exactly as the loader produced them
/// and the index list is sequential; triangle winding is defined entirely
/// by the loader's output order. No deduplication happens here.
#[derive(Debug, Default)]
pub struct Model {
    /// Flat list of vertex records.
    pub vertices: Vec<ModelVertex>,
    /// Index list matching the vertex order.
    pub indices: Vec<u32>,
}

impl Model {
    /// Loads a model from an OBJ file.
    ///
    /// All meshes in the file are merged into one vertex/index pair.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the .obj file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or contains no
    /// geometry.
    pub fn load(path: &Path) -> ResourceResult<Self> {
        let (meshes, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| ResourceError::ObjLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for model in &meshes {
            let mesh = &model.mesh;

            for &index in &mesh.indices {
                let i = index as usize;

                let position = [
                    mesh.positions[3 * i],
                    mesh.positions[3 * i + 1],
                    mesh.positions[3 * i + 2],
                ];

                // OBJ uses a bottom-left UV origin; flip V for Vulkan
                let tex_coord = if mesh.texcoords.is_empty() {
                    [0.0, 0.0]
                } else {
                    [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
                };

                vertices.push(ModelVertex {
                    position,
                    tex_coord,
                });
                indices.push(indices.len() as u32);
            }
        }

        if vertices.is_empty() {
            return Err(ResourceError::NoGeometry(path.to_path_buf()));
        }

        info!(
            "Model loaded: {} ({} vertices, {} triangles)",
            path.display(),
            vertices.len(),
            indices.len() / 3
        );

        Ok(Self { vertices, indices })
    }

    /// Returns the number of triangles in the model.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_obj(name: &str, content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("viewer-test-{}-{}.obj", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_single_triangle() {
        let path = write_temp_obj(
            "triangle",
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vt 0.0 0.0\n\
             vt 1.0 0.0\n\
             vt 0.0 1.0\n\
             f 1/1 2/2 3/3\n",
        );

        let model = Model::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.indices, vec![0, 1, 2]);
        assert_eq!(model.triangle_count(), 1);

        // Face order preserved, V flipped
        assert_eq!(model.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(model.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(model.vertices[2].tex_coord, [0.0, 0.0]);
    }

    #[test]
    fn test_indices_are_sequential() {
        let path = write_temp_obj(
            "quad",
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             v 1.0 1.0 0.0\n\
             f 1 2 3\n\
             f 2 4 3\n",
        );

        let model = Model::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // No deduplication: six face-vertices, six sequential indices
        assert_eq!(model.vertices.len(), 6);
        assert_eq!(model.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = Model::load(Path::new("/nonexistent/model.obj"));
        assert!(matches!(result, Err(ResourceError::ObjLoad { .. })));
    }
}
