//! Scene model: entities, lights, and light-indicator entities.
//!
//! Collections are flat and ordered; packing order equals draw order, and the
//! orchestrator binds uniform regions by the same index the packer wrote them
//! with.

use cgmath::{InnerSpace, Matrix4, Rad, Vector3};

use crate::packing::AlignedRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Directional,
    Point,
}

impl LightType {
    /// Tag value written into the global parameter block; the shaders switch
    /// on the same constants.
    pub fn tag(self) -> u32 {
        match self {
            LightType::Directional => 0,
            LightType::Point => 1,
        }
    }
}

/// A scene light. Directional lights use `position` only for indicator
/// placement; point lights use `direction` only for indicator orientation.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub kind: LightType,
    pub color: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub position: Vector3<f32>,
}

impl Light {
    pub fn directional(color: Vector3<f32>, direction: Vector3<f32>, position: Vector3<f32>) -> Self {
        Self {
            kind: LightType::Directional,
            color,
            direction,
            position,
        }
    }

    pub fn point(color: Vector3<f32>, direction: Vector3<f32>, position: Vector3<f32>) -> Self {
        Self {
            kind: LightType::Point,
            color,
            direction,
            position,
        }
    }
}

/// A drawable scene object: a world transform plus a model registry index.
///
/// `local_region` is the uniform sub-range last packed for this entity; the
/// packer rewrites it once per frame.
#[derive(Debug, Clone)]
pub struct Entity {
    pub world: Matrix4<f32>,
    pub model: usize,
    pub local_region: AlignedRegion,
}

impl Entity {
    pub fn new(world: Matrix4<f32>, model: usize) -> Self {
        Self {
            world,
            model,
            local_region: AlignedRegion::default(),
        }
    }
}

/// Compose a translation and a non-uniform scale into one world matrix.
pub fn position_scale(position: Vector3<f32>, scale: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(position)
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

/// Tilt a world matrix one radian around the given axis. Used to orient
/// light indicators along the light direction; a degenerate axis leaves the
/// matrix untouched.
pub fn tilt_toward(matrix: Matrix4<f32>, axis: Vector3<f32>) -> Matrix4<f32> {
    if axis.magnitude2() <= f32::EPSILON {
        return matrix;
    }
    matrix * Matrix4::from_axis_angle(axis.normalize(), Rad(1.0))
}

/// The flat scene: main entities, lights, and the derived light-indicator
/// entities. Edited between frames only; the per-frame core reads it and
/// rewrites entity regions.
#[derive(Debug, Default)]
pub struct Scene {
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
    pub indicators: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entity(&mut self, world: Matrix4<f32>, model: usize) {
        self.entities.push(Entity::new(world, model));
    }

    pub fn push_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Rebuild the indicator collection from the current lights: a quad per
    /// directional light and a sphere per point light, scaled down and tilted
    /// along the light direction. Call after editing the lights.
    pub fn rebuild_indicators(&mut self, quad_model: usize, sphere_model: usize) {
        self.indicators.clear();
        for light in &self.lights {
            let model = match light.kind {
                LightType::Directional => quad_model,
                LightType::Point => sphere_model,
            };
            let world = tilt_toward(
                position_scale(light.position, Vector3::new(0.3, 0.3, 0.3)),
                light.direction,
            );
            self.indicators.push(Entity::new(world, model));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{SquareMatrix, Zero};

    #[test]
    fn position_scale_places_translation_in_last_column() {
        let m = position_scale(Vector3::new(2.0, -1.0, 4.0), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(m.w.x, 2.0);
        assert_eq!(m.w.y, -1.0);
        assert_eq!(m.w.z, 4.0);
    }

    #[test]
    fn tilt_with_zero_axis_is_identity() {
        let m = position_scale(Vector3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(tilt_toward(m, Vector3::zero()), m);
    }

    #[test]
    fn indicators_track_light_kinds_in_order() {
        let mut scene = Scene::new();
        scene.push_light(Light::directional(
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
        ));
        scene.push_light(Light::point(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(-7.0, 1.0, -2.0),
        ));
        scene.rebuild_indicators(10, 11);

        assert_eq!(scene.indicators.len(), 2);
        assert_eq!(scene.indicators[0].model, 10);
        assert_eq!(scene.indicators[1].model, 11);
        // Indicator sits at the light position.
        assert_eq!(scene.indicators[1].world.w.x, -7.0);
    }

    #[test]
    fn rebuild_replaces_previous_indicators() {
        let mut scene = Scene::new();
        scene.push_light(Light::point(
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 2.0, -1.0),
        ));
        scene.rebuild_indicators(0, 1);
        scene.rebuild_indicators(0, 1);
        assert_eq!(scene.indicators.len(), 1);
    }

    #[test]
    fn new_entity_has_empty_region() {
        let e = Entity::new(Matrix4::identity(), 0);
        assert_eq!(e.local_region, AlignedRegion::default());
    }
}
