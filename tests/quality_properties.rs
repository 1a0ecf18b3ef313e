use mesh_adapt::geometry::metric::{determinant, fuse_metrics, identity, isotropic_metric, Matrix};
use mesh_adapt::geometry::quality::{isotropic_quality, metric_quality, simplex_size};
use proptest::prelude::*;

fn triangle() -> impl Strategy<Value = [[f64; 2]; 3]> {
    prop::array::uniform3(prop::array::uniform2(-10.0f64..10.0))
}

fn tet() -> impl Strategy<Value = [[f64; 3]; 4]> {
    prop::array::uniform4(prop::array::uniform3(-10.0f64..10.0))
}

fn spd2() -> impl Strategy<Value = Matrix<2>> {
    (0.1f64..10.0, 0.1f64..10.0, -1.0f64..1.0).prop_map(|(a, b, t)| {
        let off = t * (a * b).sqrt() * 0.9;
        [[a, off], [off, b]]
    })
}

proptest! {
    #[test]
    fn quality_is_bounded_and_signed(p in triangle()) {
        let q = isotropic_quality::<2>(&p);
        prop_assert!(q <= 1.0 + 1e-9);
        let size = simplex_size::<2>(&p);
        if size.abs() > 1e-9 {
            prop_assert_eq!(q.signum(), size.signum());
        }
    }

    #[test]
    fn rotating_vertices_keeps_quality(p in triangle()) {
        let q = isotropic_quality::<2>(&p);
        let rotated = [p[1], p[2], p[0]];
        prop_assert!((isotropic_quality::<2>(&rotated) - q).abs() < 1e-9);
        // an odd permutation flips the orientation only
        let swapped = [p[1], p[0], p[2]];
        prop_assert!((isotropic_quality::<2>(&swapped) + q).abs() < 1e-9);
    }

    #[test]
    fn quality_is_scale_invariant(p in tet(), s in 0.01f64..100.0) {
        let q = isotropic_quality::<3>(&p);
        let scaled: Vec<[f64; 3]> = p.iter().map(|v| [v[0] * s, v[1] * s, v[2] * s]).collect();
        prop_assert!((isotropic_quality::<3>(&scaled) - q).abs() < 1e-7);
    }

    #[test]
    fn identity_metric_is_euclidean(p in tet()) {
        let q = isotropic_quality::<3>(&p);
        prop_assert!((metric_quality::<3>(&p, &identity::<3>()) - q).abs() < 1e-9);
    }

    #[test]
    fn uniform_metric_does_not_change_shape(p in triangle(), h in 0.05f64..20.0) {
        let q = isotropic_quality::<2>(&p);
        let m = isotropic_metric::<2>(h);
        prop_assert!((metric_quality::<2>(&p, &m) - q).abs() < 1e-7);
    }

    #[test]
    fn fusion_picks_the_largest_determinant(a in spd2(), b in spd2()) {
        let ab = fuse_metrics(&[a, b]).unwrap();
        let ba = fuse_metrics(&[b, a]).unwrap();
        prop_assert_eq!(determinant(&ab), determinant(&ba));
        prop_assert!(determinant(&ab) >= determinant(&a));
        prop_assert!(determinant(&ab) >= determinant(&b));
    }
}
