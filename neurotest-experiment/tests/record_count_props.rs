use neurotest_core::{ArrowDirection, ResponseButton, StimulusType, TestVariant, TrialDefinition};
use neurotest_experiment::{MemorySink, TrialRunner, VariantTimings};
use neurotest_timing::ManualTimer;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn go_no_go_trial() -> impl Strategy<Value = (bool, bool, u64)> {
    // (arrow up, participant presses, press latency in ms)
    (any::<bool>(), any::<bool>(), 0u64..1000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_record_per_presented_trial(plan in prop::collection::vec(go_no_go_trial(), 1..12)) {
        let trials = plan
            .iter()
            .enumerate()
            .map(|(id, &(up, _, _))| {
                let direction = if up { ArrowDirection::Up } else { ArrowDirection::Down };
                TrialDefinition::new(id, StimulusType::Arrow { direction })
            })
            .collect();
        let sink = MemorySink::new();
        let timer = ManualTimer::new();
        let mut runner = TrialRunner::new(
            "prop",
            TestVariant::GoNoGo,
            trials,
            timer.clone(),
            StdRng::seed_from_u64(0),
            Box::new(sink.clone()),
        )
        .unwrap()
        .with_timings(VariantTimings::for_variant(TestVariant::GoNoGo).with_lead_in(0));

        runner.start();
        for &(_, press, latency) in &plan {
            timer.advance_ms(1000);
            runner.update();
            timer.advance_ms(latency);
            runner.update();
            if press {
                // Mash the key; only the first press may count.
                runner.handle_response(ResponseButton::Press);
                runner.handle_response(ResponseButton::Press);
            }
            timer.advance_ms(1000 - latency);
            runner.update();
        }

        let runs = sink.runs();
        prop_assert_eq!(runs.len(), 1);
        prop_assert_eq!(runs[0].records.len(), plan.len());
        for (record, &(up, press, latency)) in runs[0].records.iter().zip(&plan) {
            prop_assert_eq!(record.is_correct, up == press);
            let expected_rt = if press { Some(latency) } else { None };
            prop_assert_eq!(record.reaction_time_ms, expected_rt);
        }
    }

    #[test]
    fn seeded_provider_always_yields_a_permutation(seed in any::<u64>()) {
        let provider = neurotest_experiment::TrialSetProvider::new().with_seed(Some(seed));
        for variant in TestVariant::ALL {
            let mut ids: Vec<usize> = provider.get_trials(variant).iter().map(|t| t.id).collect();
            ids.sort_unstable();
            let expected: Vec<usize> = (0..ids.len()).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
