//! JSON round-trip tests for the serialisable types.
//!
//! Run with: `cargo test --features serde`
//!
//! Hosts persist configurations and cache calibrations between runs; these
//! must come back exactly as they were written.

#[cfg(feature = "serde")]
mod tests {
    use truncgauss::{
        Calibration, Energy, FeatureKind, FloorPolicy, FormConfig, MixtureParameters,
        RestraintForm, TruncatedGaussian, TruncationCalibrator,
    };

    fn two_mode() -> MixtureParameters {
        MixtureParameters::new(2.0, 5.0, 1.0, &[0.5, 0.5], &[0.0, 10.0], &[1.0, 1.0]).unwrap()
    }

    #[test]
    fn config_round_trip() {
        let cfg = FormConfig {
            rt: 0.6,
            calibration_cycles: 30,
            floor_policy: FloorPolicy::Reject,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: FormConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn config_from_hand_written_json() {
        let json = r#"{"rt":0.5900991,"calibration_cycles":20,"floor_policy":"Clamp"}"#;
        let cfg: FormConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg, FormConfig::default());
    }

    #[test]
    fn parameters_round_trip() {
        let p = two_mode();
        let json = serde_json::to_string(&p).unwrap();
        let back: MixtureParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn calibration_round_trip_reproduces_energy() {
        let p = two_mode();
        let cal = TruncationCalibrator::new(&FormConfig::default()).calibrate(&p).unwrap();
        let json = serde_json::to_string(&cal).unwrap();
        let back: Calibration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cal);

        let form = TruncatedGaussian::new();
        let hosted = form
            .evaluate(3.0, FeatureKind::Distance, 2, p.to_buffer().as_slice(), true)
            .unwrap();
        let cached = truncgauss::EnergyEvaluator::new(&p, &back, truncgauss::RT)
            .evaluate(3.0, FeatureKind::Distance, &truncgauss::StandardDelta, true)
            .unwrap();
        assert_eq!(hosted, cached);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let payloads = [
            // no components
            r#"{"energy_ceiling":2.0,"transition_slope":1.0,"transition_distance_scale":3.0,
                "weights":[],"means":[],"stdevs":[]}"#,
            // mismatched lengths
            r#"{"energy_ceiling":2.0,"transition_slope":1.0,"transition_distance_scale":3.0,
                "weights":[0.5,0.5],"means":[0.0],"stdevs":[1.0,1.0]}"#,
            // negative spread
            r#"{"energy_ceiling":2.0,"transition_slope":1.0,"transition_distance_scale":3.0,
                "weights":[1.0],"means":[5.0],"stdevs":[-1.0]}"#,
        ];
        for json in payloads {
            assert!(serde_json::from_str::<MixtureParameters>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn invalid_calibration_is_rejected() {
        let payloads = [
            r#"{"amp":[],"floor":[],"onset":[],"amp_dominant":true}"#,
            r#"{"amp":[0.4,0.4],"floor":[0.01],"onset":[2.0,2.0],"amp_dominant":true}"#,
            r#"{"amp":[0.4],"floor":[0.9],"onset":[2.0],"amp_dominant":true}"#,
            r#"{"amp":[0.4],"floor":[0.01],"onset":[-2.0],"amp_dominant":true}"#,
        ];
        for json in payloads {
            assert!(serde_json::from_str::<Calibration>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn deserialised_parameters_drive_range_estimation() {
        let json = serde_json::to_string(&two_mode()).unwrap();
        let p: MixtureParameters = serde_json::from_str(&json).unwrap();
        let r = truncgauss::estimate_range(&p, 2.0);
        assert_eq!((r.min, r.max), (0.0, 12.0));
    }

    #[test]
    fn energy_serialises_missing_derivative_as_null() {
        let e = Energy { value: 1.25, derivative: None };
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"value":1.25,"derivative":null}"#);
    }

    #[test]
    fn feature_kind_round_trip() {
        for kind in [
            FeatureKind::Distance,
            FeatureKind::Angle,
            FeatureKind::Dihedral,
            FeatureKind::Other(11),
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(serde_json::from_str::<FeatureKind>(&json).unwrap(), kind);
        }
    }
}
