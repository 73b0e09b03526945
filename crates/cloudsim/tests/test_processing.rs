use approx::assert_relative_eq;

use simcore::simulation::Simulation;

use cloudsim::core::cloudlet::{Cloudlet, CloudletStatus};
use cloudsim::core::cloudlet_scheduler::{CloudletScheduler, CloudletSchedulerKind};
use cloudsim::core::config::SimulationConfig;
use cloudsim::core::host::HostSpec;
use cloudsim::core::vm::{VmSpec, VmStatus};
use cloudsim::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

// Creates simulation with a single host with 2 PEs of 1000 MIPS and a broker.
fn new_cloud_sim() -> (CloudSimulation, u32) {
    let _ = env_logger::builder().is_test(true).try_init();
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
    (cloud_sim, b)
}

fn vm_spec(id: u32, pes: u32, scheduler: CloudletSchedulerKind) -> VmSpec {
    VmSpec::new(id, pes, 1000., 1024, 100, 1000).with_scheduler(scheduler)
}

#[test]
// Two cloudlets of 1000 MI share a single PE of 1000 MIPS and both finish at time 2.
fn test_time_shared() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(1, 0, 1000., 1));

    cloud_sim.step_for_duration(1.);
    let vm = cloud_sim.vm(0).unwrap();
    assert_eq!(vm.scheduler().allocated_mips_for_cloudlet(0), 500.);
    assert_eq!(vm.scheduler().allocated_mips_for_cloudlet(1), 500.);
    assert_eq!(vm.used_mips(), 1000.);

    cloud_sim.step_until_no_events();
    let returned = cloud_sim.broker(b).borrow().returned_cloudlets();
    assert_eq!(returned.len(), 2);
    for cloudlet in returned {
        assert_eq!(cloudlet.status(), CloudletStatus::Success);
        assert_eq!(cloudlet.exec_start_time, Some(0.));
        assert_relative_eq!(cloudlet.finish_time.unwrap(), 2.);
        assert_eq!(cloudlet.remaining, 0.);
    }
    assert_eq!(cloud_sim.vm(0).unwrap().status(), VmStatus::Destroyed);
    assert_eq!(cloud_sim.host(0).unwrap().allocated_pes(), 0);
}

#[test]
// The second cloudlet waits until the first one releases the only PE.
fn test_space_shared() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::SpaceShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(1, 0, 1000., 1));

    cloud_sim.step_for_duration(0.5);
    let vm = cloud_sim.vm(0).unwrap();
    assert_eq!(vm.scheduler().allocated_mips_for_cloudlet(0), 1000.);
    assert_eq!(vm.scheduler().allocated_mips_for_cloudlet(1), 0.);
    assert_eq!(vm.scheduler().cloudlet(1).unwrap().status(), CloudletStatus::Ready);

    cloud_sim.step_until_no_events();
    let broker = cloud_sim.broker(b);
    let first = broker.borrow().returned_cloudlet(0).unwrap();
    let second = broker.borrow().returned_cloudlet(1).unwrap();
    assert_eq!(first.status(), CloudletStatus::Success);
    assert_relative_eq!(first.finish_time.unwrap(), 1.);
    assert_eq!(second.status(), CloudletStatus::Success);
    assert_relative_eq!(second.exec_start_time.unwrap(), 1.);
    assert_relative_eq!(second.finish_time.unwrap(), 2.);
}

#[test]
// Cloudlet paused at time 2 keeps its progress and finishes 2 seconds after being resumed at time 10.
fn test_pause_resume() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(1, 0, 3000., 1));

    cloud_sim.step_for_duration(2.);
    assert_eq!(cloud_sim.current_time(), 2.);
    assert_eq!(
        cloud_sim.broker(b).borrow().returned_cloudlet(0).unwrap().status(),
        CloudletStatus::Success
    );

    cloud_sim.pause_cloudlet(b, 0, 1);
    cloud_sim.step_for_duration(8.);
    assert_eq!(cloud_sim.current_time(), 10.);
    let cloudlet = cloud_sim.vm(0).unwrap().scheduler().cloudlet(1).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Paused);
    assert_relative_eq!(cloudlet.processed(), 1000.);
    assert_eq!(cloud_sim.vm(0).unwrap().used_mips(), 0.);

    cloud_sim.resume_cloudlet(b, 0, 1);
    cloud_sim.step_until_no_events();
    let cloudlet = cloud_sim.broker(b).borrow().returned_cloudlet(1).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Success);
    assert_eq!(cloudlet.exec_start_time, Some(0.));
    assert_relative_eq!(cloudlet.finish_time.unwrap(), 12.);
}

#[test]
// Canceled cloudlets are returned to the broker, whether they have reached the VM or not.
fn test_cancel() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(1, 0, 5000., 1));
    // still held by the broker
    cloud_sim.cancel_cloudlet(b, 0, 0);
    assert_eq!(
        cloud_sim.broker(b).borrow().returned_cloudlet(0).unwrap().status(),
        CloudletStatus::Canceled
    );

    cloud_sim.step_for_duration(1.);
    cloud_sim.cancel_cloudlet(b, 0, 1);
    cloud_sim.step_until_no_events();

    let cloudlet = cloud_sim.broker(b).borrow().returned_cloudlet(1).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Canceled);
    assert_eq!(cloudlet.finish_time, Some(0.));
    assert_eq!(cloud_sim.vm(0).unwrap().status(), VmStatus::Destroyed);
}

#[test]
// Destroying a VM fails its unfinished cloudlets and releases host resources.
fn test_vm_destroy_fails_cloudlets() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 2, CloudletSchedulerKind::SpaceShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 10000., 1));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(1, 0, 10000., 2));

    cloud_sim.step_for_duration(1.);
    assert_eq!(cloud_sim.host(0).unwrap().allocated_pes(), 2);
    cloud_sim.destroy_vm(b, 0);
    cloud_sim.step_until_no_events();

    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().destroyed_vms(), vec![0]);
    let returned = broker.borrow().returned_cloudlets();
    assert_eq!(returned.len(), 2);
    assert!(returned.iter().all(|c| c.status() == CloudletStatus::Failed));
    assert!(returned.iter().all(|c| c.finish_time == Some(0.)));

    let vm = cloud_sim.vm(0).unwrap();
    assert_eq!(vm.status(), VmStatus::Destroyed);
    assert_eq!(vm.host(), None);
    assert_eq!(vm.finish_time, Some(0.));
    let host = cloud_sim.host(0).unwrap();
    assert_eq!(host.allocated_pes(), 0);
    assert_eq!(host.allocated_ram(), 0);
    assert!(host.vm_ids().is_empty());
}

#[test]
// Host utilization history records requested MIPS at every processing update.
fn test_utilization_history() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 4000., 1));
    cloud_sim.step_until_no_events();

    let host = cloud_sim.host(0).unwrap();
    let history = host.utilization_history();
    assert_eq!(history[0].time, 0.);
    assert_eq!(history[0].requested_mips, 1000.);
    assert_eq!(history[0].allocated_mips, 1000.);
    let last = history.last().unwrap();
    assert_relative_eq!(last.time, 10.);
    assert_eq!(last.requested_mips, 0.);
    assert!(!last.active);
    assert!(host.utilization_values().iter().all(|u| *u >= 0. && *u <= 0.5));
}

#[test]
// Periodic updates stop once no VM has work, so the run ends even though an idle VM is still alive.
fn test_run_ends_when_workload_is_done() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_vm(b, vm_spec(1, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));

    cloud_sim.step_until_no_events();
    // the last event is the update at the end of the first scheduling interval
    assert_eq!(cloud_sim.current_time(), 10.);
    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().destroyed_vms(), vec![0]);
    assert_eq!(broker.borrow().returned_cloudlets().len(), 1);
    assert_eq!(cloud_sim.vm(0).unwrap().status(), VmStatus::Destroyed);
    assert_eq!(cloud_sim.vm(1).unwrap().status(), VmStatus::Running);
}

#[test]
// VM kept after its cloudlets are done does not keep the simulation running.
fn test_run_ends_without_destroying_idle_vms() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.broker(b).borrow_mut().set_destroy_idle_vms(false);
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));

    cloud_sim.step_until_no_events();
    assert_eq!(cloud_sim.current_time(), 10.);
    let broker = cloud_sim.broker(b);
    assert!(broker.borrow().destroyed_vms().is_empty());
    assert_eq!(
        broker.borrow().returned_cloudlet(0).unwrap().status(),
        CloudletStatus::Success
    );
    assert_eq!(cloud_sim.vm(0).unwrap().status(), VmStatus::Running);
    assert_eq!(cloud_sim.host(0).unwrap().allocated_pes(), 1);
}

#[test]
// Cloudlet with an id already known to the VM is returned as failed and does not block the VM destruction.
fn test_duplicate_cloudlet_is_returned_failed() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::TimeShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));

    cloud_sim.step_until_no_events();
    let broker = cloud_sim.broker(b);
    let returned = broker.borrow().returned_cloudlets();
    assert_eq!(returned.len(), 2);
    assert_eq!(returned[0].status(), CloudletStatus::Failed);
    assert_eq!(returned[0].finish_time, Some(0.));
    assert_eq!(returned[1].status(), CloudletStatus::Success);
    assert_relative_eq!(returned[1].finish_time.unwrap(), 1.);
    assert_eq!(broker.borrow().destroyed_vms(), vec![0]);
}

#[test]
// Space-shared VM cannot ever run a cloudlet needing more PEs than it has, such cloudlet fails on submission.
fn test_cloudlet_larger_than_vm_fails() {
    let (mut cloud_sim, b) = new_cloud_sim();
    cloud_sim.submit_vm(b, vm_spec(0, 1, CloudletSchedulerKind::SpaceShared));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 2));

    cloud_sim.step_until_no_events();
    assert_eq!(cloud_sim.current_time(), 0.);
    let broker = cloud_sim.broker(b);
    let cloudlet = broker.borrow().returned_cloudlet(0).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Failed);
    assert_eq!(cloudlet.finish_time, Some(0.));
    assert_eq!(broker.borrow().destroyed_vms(), vec![0]);
}
