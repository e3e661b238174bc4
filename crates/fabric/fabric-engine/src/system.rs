use std::collections::BTreeMap;

use bedrock_kernel::{ProcId, Simulation};
use fabric_config::{ConfigError, FabricSimConfig};
use fabric_core::Signal;

use crate::arbiter::{Arbiter, ArbiterRotor, SharedArbiter};
use crate::fabric::{FabricProcess, SocketHandle};
use crate::initiator::InitiatorProcess;
use crate::procedure::Procedure;
use crate::queue::{Queue, SharedQueue};
use crate::socket::{SharedSocket, SocketProcess, SocketState};
use crate::stats::{FabricStats, SharedStats};
use crate::target::TargetProcess;

/// Handles into a built fabric testbench, for the bin's report and for
/// invariant checks in tests.
pub struct FabricSystem {
    pub fabric: ProcId,
    pub arbiter: SharedArbiter,
    /// Flattened `"<initiator>.<queue>"` → queue.
    pub queues: Vec<(String, SharedQueue)>,
    pub sockets: Vec<(String, SharedSocket)>,
    pub stats: SharedStats,
}

impl FabricSystem {
    /// Bytes still resident across every queue.
    pub fn resident_bytes(&self) -> u64 {
        self.queues.iter().map(|(_, q)| q.borrow().fullness()).sum()
    }

    /// Number of initiator sockets currently holding the grant.
    pub fn granted_initiator_sockets(&self) -> usize {
        self.sockets
            .iter()
            .filter(|(_, s)| {
                let s = s.borrow();
                s.is_initiator() && s.is_granted()
            })
            .count()
    }
}

/// Instantiates every component of the fabric model into `sim`.
///
/// Creation order follows the sorted config sections: per initiator its
/// procedures then its aggregate process, then targets, then the fabric's
/// sockets and arbiter, and the fabric itself last (its id is declared first
/// so sockets and dequeue jobs can address it).
pub fn build(
    sim: &mut Simulation<Signal>,
    config: &FabricSimConfig,
) -> Result<FabricSystem, ConfigError> {
    config.validate()?;

    let stats = FabricStats::new_shared();
    let fabric_id = sim.declare();
    let target_names: Vec<String> = config.targets.keys().cloned().collect();

    let mut initiator_ids = BTreeMap::new();
    let mut queues_by_initiator: BTreeMap<String, Vec<(String, SharedQueue)>> = BTreeMap::new();
    let mut all_queues = Vec::new();

    for (initiator_name, params) in &config.initiators {
        let clk_ns = params.clk_ns();

        let mut queues: BTreeMap<String, SharedQueue> = BTreeMap::new();
        for (queue_name, queue_params) in &params.queues {
            let queue = Queue::new_shared(
                format!("Queue_{initiator_name}_{queue_name}"),
                queue_params,
            );
            queues.insert(queue_name.clone(), queue);
        }

        for (procedure_name, procedure_params) in &params.procedures {
            let queue = queues[&procedure_params.queue].clone();
            let procedure = Procedure::new(
                initiator_name.clone(),
                procedure_name,
                procedure_params.clone(),
                clk_ns,
                queue.clone(),
                target_names.clone(),
                stats.clone(),
            );
            let pid = sim.add(Box::new(procedure));
            queue
                .borrow_mut()
                .bind_procedure(procedure_params.queue.clone(), pid);
        }

        let queue_list: Vec<(String, SharedQueue)> =
            queues.iter().map(|(n, q)| (n.clone(), q.clone())).collect();
        let pid = sim.add(Box::new(InitiatorProcess::new(
            initiator_name.clone(),
            clk_ns,
            queue_list.clone(),
            stats.clone(),
        )));
        initiator_ids.insert(initiator_name.clone(), pid);

        for (queue_name, queue) in &queue_list {
            all_queues.push((format!("{initiator_name}.{queue_name}"), queue.clone()));
        }
        queues_by_initiator.insert(initiator_name.clone(), queue_list);
    }

    let mut target_ids = BTreeMap::new();
    for (target_name, params) in &config.targets {
        let pid = sim.add(Box::new(TargetProcess::new(
            target_name.clone(),
            params.clk_ns(),
            stats.clone(),
        )));
        target_ids.insert(target_name.clone(), pid);
    }

    let fabric_clk_ns = config.fabric.clk_ns();
    let mut sockets = BTreeMap::new();
    let mut socket_states = Vec::new();
    for (socket_name, socket_params) in &config.fabric.sockets {
        let state = SocketState::new_shared(socket_name.clone(), socket_params.init_tgt);
        let pid = sim.add(Box::new(SocketProcess::new(
            state.clone(),
            fabric_id,
            fabric_clk_ns,
        )));
        socket_states.push((socket_name.clone(), state.clone()));
        sockets.insert(socket_name.clone(), SocketHandle { state, process: pid });
    }

    let arbiter = Arbiter::new_shared(
        config.initiators.keys().cloned().collect(),
        config.fabric.arbiter.start_at,
        sim.rng(),
    );
    sim.add(Box::new(ArbiterRotor::new(
        arbiter.clone(),
        config.fabric.arbiter.slot_length,
        fabric_clk_ns,
    )));

    let fabric = FabricProcess::new(
        "DATA",
        fabric_clk_ns,
        arbiter.clone(),
        sockets,
        queues_by_initiator,
        initiator_ids,
        target_ids,
    );
    sim.attach(fabric_id, Box::new(fabric));

    Ok(FabricSystem {
        fabric: fabric_id,
        arbiter,
        queues: all_queues,
        sockets: socket_states,
        stats,
    })
}
