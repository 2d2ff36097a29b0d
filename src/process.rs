//! Process utilities for exectest
//!
//! Signal delivery and process-tree inspection used to reclaim everything a
//! test spawned.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::collections::{HashMap, VecDeque};
use sysinfo::{Pid as SysPid, ProcessStatus, System};

fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
}

/// Whether `pid` names an existing process, as seen by signal 0.
///
/// `EPERM` still means the process exists. Unreaped zombies count as alive
/// here; see [`is_running`].
pub fn is_process_alive(pid: u32) -> bool {
    match to_pid(pid) {
        Some(pid) => !matches!(kill(pid, None), Err(Errno::ESRCH) | Err(Errno::EINVAL)),
        None => false,
    }
}

/// Check if a process exists and is not a zombie.
pub fn is_running(pid: u32) -> bool {
    if !is_process_alive(pid) {
        return false;
    }
    let sys_pid = SysPid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(sys_pid) {
        return false;
    }
    system.process(sys_pid).is_some_and(|process| {
        !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
    })
}

/// Check whether any process still belongs to the process group `pgid`.
pub fn group_exists(pgid: u32) -> bool {
    match to_pid(pgid) {
        Some(pgid) => !matches!(killpg(pgid, None), Err(Errno::ESRCH)),
        None => false,
    }
}

/// Send `signal` to every member of the process group `pgid`.
///
/// An empty group (`ESRCH`) is not an error: there is nothing left to signal.
pub fn signal_group(pgid: u32, signal: Signal) -> nix::Result<()> {
    let Some(pgid) = to_pid(pgid) else {
        return Err(Errno::EINVAL);
    };
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Send `signal` to a single process. A process that is already gone is not an error.
pub fn signal_process(pid: u32, signal: Signal) -> nix::Result<()> {
    let Some(pid) = to_pid(pid) else {
        return Err(Errno::EINVAL);
    };
    match kill(pid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Snapshot the PIDs of every live descendant of `root`, parents before children.
///
/// Must be taken before anything in the tree is signalled: once a parent
/// dies its children are reparented and the link to `root` is lost.
pub fn descendants(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes();

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children
                .entry(parent.as_u32())
                .or_default()
                .push(pid.as_u32());
        }
    }

    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pid) = queue.pop_front() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                if kid != root && !found.contains(&kid) {
                    found.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }
    found
}
