use crustfe::Error;
use crustfe_solid::query::{
    query_body_force, query_density, query_elastic_properties, query_lame_lambda, query_shear_modulus,
};
use crustfe_solid::{CoordinateSystem, MaterialQuery, PointDatabase, QueryContext, Scales, UniformDatabase};
use matrixcompare::assert_scalar_eq;

fn crust() -> UniformDatabase {
    UniformDatabase::new("crust")
        .with_value("density", 2000.0)
        .with_value("vs", 1000.0)
        .with_value("vp", 1732.0)
}

fn make_context(database: &UniformDatabase, space_dim: usize, scales: Scales<f64>) -> QueryContext<f64> {
    QueryContext::new(database, CoordinateSystem::cartesian(space_dim), scales).unwrap()
}

#[test]
fn elastic_moduli_from_wave_speeds() {
    let db = crust();
    let context = make_context(&db, 3, Scales::unit());
    let x = [1.0, 2.0, 3.0];

    assert_scalar_eq!(query_density(&context, &x, 0.0).unwrap(), 2000.0, comp = float);
    assert_scalar_eq!(query_shear_modulus(&context, &x, 0.0).unwrap(), 2e9, comp = float);
    assert_scalar_eq!(
        query_lame_lambda(&context, &x, 0.0).unwrap(),
        2000.0 * 1732.0 * 1732.0 - 4e9,
        comp = float
    );

    let properties = query_elastic_properties(&context, &x, 0.0).unwrap();
    assert_eq!(properties.density, query_density(&context, &x, 0.0).unwrap());
    assert_eq!(properties.lame.mu, query_shear_modulus(&context, &x, 0.0).unwrap());
    assert_eq!(properties.lame.lambda, query_lame_lambda(&context, &x, 0.0).unwrap());
}

#[test]
fn results_are_divided_by_value_scale() {
    let db = crust();
    let unit = make_context(&db, 2, Scales::unit());
    let scaled = make_context(&db, 2, Scales::new(1e3, 1e9).unwrap());
    let x = [0.5, -0.25];

    for query in [MaterialQuery::Density, MaterialQuery::ShearModulus, MaterialQuery::LameLambda] {
        let (mut unit_value, mut scaled_value) = ([0.0], [0.0]);
        query.evaluate(&unit, &mut unit_value, &x, 0.0).unwrap();
        query.evaluate(&scaled, &mut scaled_value, &x, 0.0).unwrap();
        assert_scalar_eq!(scaled_value[0], unit_value[0] / 1e9, comp = float);
    }

    let properties = query_elastic_properties(&scaled, &x, 0.0).unwrap();
    assert_scalar_eq!(properties.density, 2e-6, comp = float);
    assert_scalar_eq!(properties.lame.mu, 2.0, comp = float);
}

#[test]
fn locations_are_dimensionalized_with_length_scale() {
    // Two samples 1 km apart
    let db = PointDatabase::from_points(
        "layers",
        CoordinateSystem::cartesian(1),
        vec!["density".to_string()],
        &[0.0, 1000.0],
        vec![2000.0, 3000.0],
    )
    .unwrap();
    let context = QueryContext::new(&db, CoordinateSystem::cartesian(1), Scales::new(1e3, 1.0).unwrap()).unwrap();

    assert_eq!(query_density(&context, &[0.4], 0.0).unwrap(), 2000.0);
    assert_eq!(query_density(&context, &[0.9], 0.0).unwrap(), 3000.0);
}

#[test]
fn non_positive_values_are_rejected() {
    let db = crust().with_value("vs", -5.0);
    let context = make_context(&db, 2, Scales::new(10.0, 1.0).unwrap());
    let x = [0.5, 1.5];

    let expected = Error::InvalidMaterialValue {
        cell: None,
        field: "vs".to_string(),
        value: -5.0,
        location: vec![5.0, 15.0],
        database: "crust".to_string(),
    };
    assert_eq!(query_shear_modulus(&context, &x, 0.0), Err(expected.clone()));
    assert_eq!(query_lame_lambda(&context, &x, 0.0), Err(expected.clone()));
    assert_eq!(query_elastic_properties(&context, &x, 0.0), Err(expected));
    // The density alone is fine
    assert_eq!(query_density(&context, &x, 0.0), Ok(2000.0));

    let db = crust().with_value("density", 0.0);
    let context = make_context(&db, 2, Scales::unit());
    assert!(matches!(
        query_shear_modulus(&context, &x, 0.0),
        Err(Error::InvalidMaterialValue { ref field, .. }) if field == "density"
    ));

    let db = crust().with_value("vp", 0.0);
    let context = make_context(&db, 2, Scales::unit());
    assert!(matches!(
        query_lame_lambda(&context, &x, 0.0),
        Err(Error::InvalidMaterialValue { ref field, .. }) if field == "vp"
    ));
    // The shear modulus does not depend on vp
    assert!(query_shear_modulus(&context, &x, 0.0).is_ok());
}

#[test]
fn missing_fields_fail_lookup() {
    let db = UniformDatabase::new("partial")
        .with_value("density", 2000.0)
        .with_value("vs", 1000.0);
    let context = make_context(&db, 1, Scales::new(2.0, 1.0).unwrap());

    assert!(query_shear_modulus(&context, &[3.0], 0.0).is_ok());
    assert_eq!(
        query_lame_lambda(&context, &[3.0], 0.0),
        Err(Error::DatabaseLookup {
            cell: None,
            fields: vec!["density".to_string(), "vs".to_string(), "vp".to_string()],
            location: vec![6.0],
            database: "partial".to_string(),
        })
    );
}

#[test]
fn body_force_per_dimension() {
    let db = UniformDatabase::new("forces")
        .with_value("body-force-x", 1.0)
        .with_value("body-force-y", -2.0)
        .with_value("body-force-z", 3.0);

    let context_2d = make_context(&db, 2, Scales::new(1.0, 0.5).unwrap());
    let mut force = [0.0; 2];
    query_body_force(&context_2d, &mut force, &[0.0, 0.0], 0.0).unwrap();
    assert_eq!(force, [2.0, -4.0]);

    let context_3d = make_context(&db, 3, Scales::unit());
    let mut force = [0.0; 3];
    query_body_force(&context_3d, &mut force, &[0.0, 0.0, 0.0], 0.0).unwrap();
    assert_eq!(force, [1.0, -2.0, 3.0]);

    assert_eq!(
        query_body_force(&context_3d, &mut [0.0; 2], &[0.0, 0.0, 0.0], 0.0),
        Err(Error::dimension_mismatch("query values", 3, 2))
    );
}

#[test]
fn query_field_names() {
    assert_eq!(MaterialQuery::Density.field_names(3), &["density"]);
    assert_eq!(MaterialQuery::ShearModulus.field_names(3), &["density", "vs"]);
    assert_eq!(MaterialQuery::LameLambda.field_names(1), &["density", "vs", "vp"]);
    assert_eq!(MaterialQuery::BodyForce.field_names(1), &["body-force-x"]);
    assert_eq!(MaterialQuery::BodyForce.field_names(2), &["body-force-x", "body-force-y"]);
    assert_eq!(MaterialQuery::BodyForce.num_values(3), 3);
    assert_eq!(MaterialQuery::LameLambda.num_values(3), 1);
}

#[test]
fn location_dimension_must_match_context() {
    let db = crust();
    let context = make_context(&db, 2, Scales::unit());
    assert_eq!(
        query_density(&context, &[0.0, 0.0, 0.0], 0.0),
        Err(Error::dimension_mismatch("query location", 2, 3))
    );
}

#[test]
fn invalid_scales_are_rejected() {
    assert_eq!(
        Scales::new(0.0, 1.0),
        Err(Error::InvalidScale {
            name: "length_scale",
            value: 0.0
        })
    );
    assert_eq!(
        Scales::new(1.0, -1e3),
        Err(Error::InvalidScale {
            name: "value_scale",
            value: -1e3
        })
    );
    assert!(Scales::new(f64::INFINITY, 1.0).is_err());

    // Scales built without validation are checked when the context is created
    let db = crust();
    let scales = Scales {
        length_scale: 1.0,
        value_scale: f64::NAN,
    };
    assert!(matches!(
        QueryContext::new(&db, CoordinateSystem::cartesian(3), scales),
        Err(Error::InvalidScale {
            name: "value_scale",
            ..
        })
    ));
    assert!(matches!(
        QueryContext::new(&db, CoordinateSystem::cartesian(4), Scales::<f64>::unit()),
        Err(Error::DimensionMismatch { .. })
    ));
}

#[test]
fn scales_serde_roundtrip() {
    let scales = Scales::new(1e3, 1e10).unwrap();
    let json = serde_json::to_string(&scales).unwrap();
    let deserialized: Scales<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, scales);
    assert_eq!(Scales::<f64>::default(), Scales::unit());
}
