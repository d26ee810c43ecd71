// Randomised runs of the tandem queue, checked against M/M/1 steady state
// and against the invariants every run must satisfy.

use approx::assert_relative_eq;
use tandem_queue::{
    ConfigError, ReplicationSummary, RunReport, Stage, TandemAnalytic, TandemConfig, TandemError,
    TandemSimulation,
};

fn default_scenario(seed: u64) -> TandemSimulation {
    TandemSimulation::new(TandemConfig::default().with_seed(seed)).unwrap()
}

fn long_scenario(seed: u64) -> TandemSimulation {
    let config = TandemConfig {
        arrival_rate: 1.0,
        service_rate_stage1: 5.0 / 3.0,
        service_rate_stage2: 1.5,
        client_count: 100,
        horizon: 150.0,
        ..TandemConfig::default()
    };
    TandemSimulation::new(config.with_seed(seed)).unwrap()
}

fn successful(results: Vec<Result<RunReport, String>>) -> Vec<RunReport> {
    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|e| panic!("replication failed: {e}")))
        .collect()
}

#[test]
fn given_default_scenario_when_replicated_then_utilization_is_near_rho() {
    // GIVEN: λ=2, μ1=3, μ2=4, one server each, 50 clients, horizon 30
    let simulation = default_scenario(2024);
    let analytic = TandemAnalytic::new(simulation.config()).unwrap();

    // WHEN
    let results = simulation.replicate(100, None);
    let summary = ReplicationSummary::from_results(&results);

    // THEN: averaged busy fractions sit close to λ/μ (finite runs start empty)
    assert_eq!(summary.failed, 0);
    for stage in Stage::ALL {
        let utilization = summary.stage(stage).utilization.unwrap();
        let rho = analytic.stage(stage).utilization();
        assert!(
            (utilization.mean - rho).abs() < 0.12,
            "{stage}: simulated {:.3} vs analytic {rho:.3}",
            utilization.mean
        );
    }
}

#[test]
fn given_long_scenario_when_replicated_then_mean_sojourn_is_near_the_tandem_formula() {
    // GIVEN: λ=1, μ1=5/3, μ2=3/2, 100 clients, horizon 150
    let simulation = long_scenario(7);
    let analytic = TandemAnalytic::new(simulation.config()).unwrap();
    let expected = analytic.mean_time_in_system();
    assert_relative_eq!(expected, 3.5, epsilon = 1e-12);

    // WHEN
    let summary = ReplicationSummary::from_results(&simulation.replicate(100, Some(4)));

    // THEN
    let sojourn = summary.mean_sojourn.unwrap();
    assert_eq!(sojourn.n, 100);
    assert_relative_eq!(sojourn.mean, expected, max_relative = 0.3);
}

#[test]
fn every_run_accounts_for_every_client() {
    let reports = successful(default_scenario(99).replicate(50, None));

    for report in &reports {
        assert!(report.spawned <= report.target_clients);
        assert_eq!(report.completed + report.truncated, report.spawned);
        assert_eq!(report.ledger.sojourn_count(), report.completed);
        assert!(report.tasting.current_holders <= report.tasting.capacity);
        assert!(report.survey.current_holders <= report.survey.capacity);
    }
}

#[test]
fn every_completed_client_spends_exactly_its_waits_and_services() {
    let reports = successful(default_scenario(5).replicate(20, None));

    for report in &reports {
        for client in report.completed_clients() {
            let parts: f64 = Stage::ALL
                .iter()
                .map(|&stage| {
                    let visit = client.visit(stage);
                    visit.wait.unwrap() + visit.service_time().unwrap()
                })
                .sum();
            assert_relative_eq!(client.sojourn().unwrap(), parts, epsilon = 1e-9);
            assert!(Stage::ALL.iter().all(|&s| client.visit(s).wait.unwrap() >= 0.0));
        }
    }
}

#[test]
fn single_server_tasting_serves_clients_in_arrival_order() {
    let report = default_scenario(31).run().unwrap();

    let starts: Vec<f64> = report
        .clients
        .iter()
        .filter_map(|c| c.tasting.service_start)
        .collect();
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));

    let arrivals = &report.arrival_times;
    assert!(arrivals.windows(2).all(|w| w[0] <= w[1]));
    assert!(arrivals.iter().all(|&t| t <= report.horizon));
}

#[test]
fn given_fixed_seed_when_replicated_twice_then_results_are_identical() {
    let first = default_scenario(123).replicate(8, Some(1));
    let second = default_scenario(123).replicate(8, Some(3));

    assert_eq!(first, second);

    let other = default_scenario(124).replicate(8, None);
    assert_ne!(first, other);
}

#[test]
fn given_unstable_tasting_station_when_building_then_config_error() {
    let config = TandemConfig {
        arrival_rate: 3.0,
        ..TandemConfig::default()
    };

    let err = TandemSimulation::new(config).unwrap_err();

    assert!(matches!(
        err,
        TandemError::Config(ConfigError::Unstable {
            stage: Stage::Tasting,
            ..
        })
    ));
}

#[test]
fn given_unstable_tasting_station_when_computing_steady_state_then_config_error() {
    // GIVEN: λ = μ1 = 3, so the tasting queue never settles
    let config = TandemConfig {
        arrival_rate: 3.0,
        service_rate_stage1: 3.0,
        ..TandemConfig::default()
    };

    // WHEN
    let result = TandemAnalytic::new(&config);

    // THEN: no infinite or negative figures come back
    assert!(matches!(
        result,
        Err(ConfigError::Unstable {
            stage: Stage::Tasting,
            ..
        })
    ));
}
