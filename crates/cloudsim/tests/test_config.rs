use simcore::simulation::Simulation;

use cloudsim::core::cloudlet::Cloudlet;
use cloudsim::core::cloudlet_scheduler::CloudletSchedulerKind;
use cloudsim::core::config::SimulationConfig;
use cloudsim::core::error::CloudError;
use cloudsim::core::host::HostSpec;
use cloudsim::core::vm::VmSpec;
use cloudsim::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

#[test]
fn test_defaults() {
    let config = SimulationConfig::from_str("{}").unwrap();
    assert_eq!(config, SimulationConfig::default());
    assert_eq!(config.scheduling_interval, 300.);
    assert_eq!(config.allocation_policy, "Simple");
    assert_eq!(config.vm_selection_policy, "MinimumMigrationTime");
    assert_eq!(config.overload_detector, None);
    assert_eq!(config.number_of_hosts(), 0);
}

#[test]
fn test_config_from_file() {
    let config = SimulationConfig::from_file(&name_wrapper("config_with_hosts.yaml")).unwrap();
    assert_eq!(config.scheduling_interval, 60.);
    assert_eq!(config.vm_allocation_timeout, 20.);
    // absent values are taken from defaults
    assert_eq!(config.vm_allocation_retry_period, 1.);
    assert_eq!(config.migration_bandwidth_share, 0.5);
    assert_eq!(config.seed, 42);
    assert_eq!(config.allocation_policy, "FirstFit");
    assert_eq!(config.number_of_hosts(), 3);
    assert_eq!(config.vms.len(), 2);
    assert_eq!(config.vms[0].scheduler, CloudletSchedulerKind::TimeShared);
    assert_eq!(config.vms[1].scheduler, CloudletSchedulerKind::SpaceShared);
}

#[test]
fn test_invalid_config() {
    assert!(matches!(
        SimulationConfig::from_file(&name_wrapper("missing.yaml")),
        Err(CloudError::Config(_))
    ));
    assert!(matches!(
        SimulationConfig::from_str("scheduling_interval: often"),
        Err(CloudError::Config(_))
    ));
    assert!(matches!(
        SimulationConfig::from_str("scheduling_interval: 0"),
        Err(CloudError::Config(_))
    ));
    assert!(matches!(
        SimulationConfig::from_str("min_time_between_events: 0"),
        Err(CloudError::Config(_))
    ));
    assert!(matches!(
        SimulationConfig::from_str("migration_bandwidth_share: 1.5"),
        Err(CloudError::Config(_))
    ));

    let mut config = SimulationConfig::default();
    config.allocation_policy = "RoundRobin".to_string();
    assert!(CloudSimulation::new(Simulation::new(123), config).is_err());

    let mut config = SimulationConfig::default();
    config.overload_detector = Some("Mad[safety=x]".to_string());
    assert!(CloudSimulation::new(Simulation::new(123), config).is_err());
}

#[test]
// Hosts and VM types from the config are instantiated, first fit places the VMs.
fn test_configured_simulation() {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("config_with_hosts.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(sim, sim_config).unwrap();
    let hosts = cloud_sim.hosts();
    assert_eq!(hosts.len(), 3);
    assert_eq!(hosts[1].spec.pes, 8);
    assert_eq!(hosts[2].total_mips(), 4000.);

    let b = cloud_sim.add_broker("broker");
    let vm_ids = cloud_sim.submit_configured_vms(b);
    assert_eq!(vm_ids, vec![0, 1, 2, 3]);
    // ids continue after manually submitted VMs
    cloud_sim.submit_vm(b, VmSpec::new(10, 1, 100., 128, 10, 100));
    assert_eq!(cloud_sim.submit_configured_vms(b), vec![11, 12, 13, 14]);

    cloud_sim.step_for_duration(1.);
    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().vm_host(0), Some(0));
    assert_eq!(broker.borrow().vm_host(1), Some(1));
    assert_eq!(broker.borrow().vm_host(2), Some(2));
    assert_eq!(broker.borrow().vm_host(3), Some(0));
    assert_eq!(cloud_sim.vm(3).unwrap().spec.scheduler, CloudletSchedulerKind::SpaceShared);
    assert_eq!(broker.borrow().created_vms().len(), 9);
}

#[test]
fn test_export_utilization_csv() {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(sim, sim_config).unwrap();
    cloud_sim.add_host(HostSpec {
        pes: 2,
        mips: 1000.,
        ram: 4096,
        bw: 1000,
        storage: 100000,
    });
    let b = cloud_sim.add_broker("broker");
    cloud_sim.submit_vm(b, VmSpec::new(0, 1, 1000., 1024, 100, 1000));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));
    cloud_sim.step_until_no_events();

    let path = std::env::temp_dir().join("cloudsim_test_utilization.csv");
    let path = path.to_str().unwrap();
    cloud_sim.export_utilization_csv(path).unwrap();

    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["host_id", "time", "allocated_mips", "requested_mips", "utilization", "active"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "0");
    assert_eq!(rows[0][4].parse::<f64>().unwrap(), 0.5);
    assert_eq!(&rows[0][5], "true");
    assert_eq!(rows[1][1].parse::<f64>().unwrap(), 1.);
    assert_eq!(&rows[1][5], "false");
    assert_eq!(rows[2][1].parse::<f64>().unwrap(), 10.);
}
