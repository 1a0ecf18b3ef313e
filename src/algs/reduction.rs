//! Distributed reductions over per-entity fields.
//!
//! Every function here is a collective over the supplied [`Communicator`] and
//! must be reached by all ranks in the same order, with the same arguments
//! shape-wise (a rank with no entities still participates with empty slices).

use bytemuck::{Pod, Zeroable};
use hashbrown::HashMap;

use crate::algs::communicator::{Communicator, ReduceOp};
use crate::mesh_error::MeshAdaptError;

/// Global identity of an entity shared between ranks: the ascending global ids
/// of its two endpoints for edges, `[gid, gid]` for vertices.
pub type EntityKey = [u64; 2];

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct KeyedValue {
    key: EntityKey,
    value: f64,
}

fn decode<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, MeshAdaptError> {
    if bytes.len() % std::mem::size_of::<T>() != 0 {
        return Err(MeshAdaptError::Communication(format!(
            "payload of {} bytes is not a whole number of {}-byte records",
            bytes.len(),
            std::mem::size_of::<T>()
        )));
    }
    Ok(bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

/// Global minimum of `values` (`+inf` when every rank is empty).
pub fn global_min<C: Communicator>(comm: &C, values: &[f64]) -> f64 {
    let local = values.iter().copied().fold(f64::INFINITY, f64::min);
    comm.all_reduce_f64(local, ReduceOp::Min)
}

/// Global maximum of `values` (`-inf` when every rank is empty).
pub fn global_max<C: Communicator>(comm: &C, values: &[f64]) -> f64 {
    let local = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    comm.all_reduce_f64(local, ReduceOp::Max)
}

/// Count marked entities, counting each shared entity only on its owner.
pub fn count_owned_marks<C: Communicator>(comm: &C, owned: &[bool], marks: &[bool]) -> u64 {
    let local = owned
        .iter()
        .zip(marks)
        .filter(|&(&o, &m)| o && m)
        .count() as u64;
    comm.all_reduce_u64(local, ReduceOp::Sum)
}

/// Sum per-bucket counts across ranks.
pub fn global_sum_counts<C: Communicator>(
    comm: &C,
    counts: &[u64],
) -> Result<Vec<u64>, MeshAdaptError> {
    let gathered = comm.all_gather(bytemuck::cast_slice(counts));
    let mut total = vec![0u64; counts.len()];
    for bytes in &gathered {
        let remote = decode::<u64>(bytes)?;
        if remote.len() != counts.len() {
            return Err(MeshAdaptError::Communication(format!(
                "expected {} bucket counts, received {}",
                counts.len(),
                remote.len()
            )));
        }
        for (t, r) in total.iter_mut().zip(remote) {
            *t += r;
        }
    }
    Ok(total)
}

/// Reconcile values computed independently on several ranks for the same
/// entities: every entry becomes the maximum over all ranks that hold an entry
/// with the same key. Entries never contributed anywhere stay at `default`.
pub fn sync_keyed_max<C: Communicator>(
    comm: &C,
    keys: &[EntityKey],
    values: &[f64],
    default: f64,
) -> Result<Vec<f64>, MeshAdaptError> {
    debug_assert_eq!(keys.len(), values.len());
    if comm.size() == 1 {
        // still a collective: keep the call count identical on every rank
        comm.barrier();
        return Ok(values.iter().map(|&v| v.max(default)).collect());
    }
    let local: Vec<KeyedValue> = keys
        .iter()
        .zip(values)
        .map(|(&key, &value)| KeyedValue { key, value })
        .collect();
    let gathered = comm.all_gather(bytemuck::cast_slice(&local));
    let mut best: HashMap<EntityKey, f64> = HashMap::with_capacity(local.len());
    for kv in &local {
        best.insert(kv.key, default);
    }
    for bytes in &gathered {
        for kv in decode::<KeyedValue>(bytes)? {
            if let Some(slot) = best.get_mut(&kv.key) {
                *slot = slot.max(kv.value);
            }
        }
    }
    Ok(keys.iter().map(|k| best[k]).collect())
}

/// For every local key, the lowest rank holding it and whether any other rank
/// holds it too. Returns `(owner, shared)` per key.
pub fn resolve_ownership<C: Communicator>(
    comm: &C,
    keys: &[EntityKey],
) -> Result<Vec<(usize, bool)>, MeshAdaptError> {
    let me = comm.rank();
    if comm.size() == 1 {
        comm.barrier();
        return Ok(vec![(me, false); keys.len()]);
    }
    let gathered = comm.all_gather(bytemuck::cast_slice(keys));
    let mut holders: HashMap<EntityKey, (usize, usize)> = HashMap::with_capacity(keys.len());
    for k in keys {
        holders.insert(*k, (me, 0));
    }
    for (rank, bytes) in gathered.iter().enumerate() {
        for k in decode::<EntityKey>(bytes)? {
            if let Some((owner, count)) = holders.get_mut(&k) {
                *owner = (*owner).min(rank);
                *count += 1;
            }
        }
    }
    Ok(keys
        .iter()
        .map(|k| {
            let (owner, count) = holders[k];
            (owner, count > 1)
        })
        .collect())
}

/// Reserve `count` fresh global ids on this rank, disjoint from every id in
/// use anywhere (`max_in_use` is the local maximum id, or `None` when empty).
pub fn allocate_global_ids<C: Communicator>(
    comm: &C,
    max_in_use: Option<u64>,
    count: u64,
) -> Result<std::ops::Range<u64>, MeshAdaptError> {
    let local_next = max_in_use.map_or(0, |m| m + 1);
    let next = comm.all_reduce_u64(local_next, ReduceOp::Max);
    let gathered = comm.all_gather(bytemuck::bytes_of(&count));
    let mut offset = 0u64;
    for bytes in gathered.iter().take(comm.rank()) {
        let c = decode::<u64>(bytes)?;
        offset += c.first().copied().unwrap_or(0);
    }
    let start = next + offset;
    Ok(start..start + count)
}
