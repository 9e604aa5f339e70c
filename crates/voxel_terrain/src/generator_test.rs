use super::*;

#[test]
fn test_flat_sign_convention() {
  let generator = FlatGenerator {
    height: 2.0,
    material: Material::solid(1),
  };
  assert!(generator.default_value(0, 0, 0) < 0.0, "below ground is solid");
  assert_eq!(generator.default_value(5, -3, 2), 0.0);
  assert!(generator.default_value(0, 0, 10) > 0.0, "above ground is empty");
  assert_eq!(generator.default_material(1, 2, 3), Material::solid(1));
}

#[test]
fn test_sphere_is_signed_distance() {
  let generator = SphereGenerator {
    center: Vec3::ZERO,
    radius: 4.0,
    material: Material::default(),
  };
  assert_eq!(generator.default_value(0, 0, 0), -4.0);
  assert_eq!(generator.default_value(4, 0, 0), 0.0);
  assert_eq!(generator.default_value(0, 6, 0), 2.0);
}

#[test]
fn test_closure_generator() {
  let generator = FnGenerator(|x: i32, _y: i32, _z: i32| (x as f32, Material::solid(x as u8)));
  assert_eq!(generator.sample(3, 0, 0), (3.0, Material::solid(3)));
  assert_eq!(generator.default_value(-2, 9, 9), -2.0);
}

#[test]
fn test_from_config_builds_each_kind() {
  let flat = from_config(&GeneratorConfig::Flat {
    height: 1.0,
    material: Material::default(),
  });
  assert_eq!(flat.default_value(0, 0, 1), 0.0);

  let sphere = from_config(&GeneratorConfig::Sphere {
    radius: 3.0,
    material: Material::default(),
  });
  assert_eq!(sphere.default_value(0, 0, 0), -3.0);

  let empty = from_config(&GeneratorConfig::Empty);
  assert!(empty.default_value(0, 0, 0) > 0.0);
}

#[test]
fn test_invalid_config_falls_back_to_empty() {
  let generator = from_config(&GeneratorConfig::Sphere {
    radius: f32::NAN,
    material: Material::default(),
  });
  assert!(generator.default_value(0, 0, 0) > 0.0);

  let generator = from_config(&GeneratorConfig::Flat {
    height: f32::INFINITY,
    material: Material::default(),
  });
  assert!(generator.default_value(0, 0, -100) > 0.0);
}

#[test]
fn test_resolve_prefers_explicit() {
  let explicit: Arc<dyn WorldGenerator> = Arc::new(EmptyGenerator);
  let resolved = resolve(Some(explicit), &GeneratorConfig::default());
  assert!(resolved.default_value(0, 0, -50) > 0.0);

  let resolved = resolve(None, &GeneratorConfig::default());
  assert!(resolved.default_value(0, 0, -50) < 0.0);
}
