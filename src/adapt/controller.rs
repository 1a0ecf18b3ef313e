//! The adaptation driver.
//!
//! [`adapt`] walks a fixed sequence of phases:
//!
//! 1. validate the options and warn about an already-invalid input mesh;
//! 2. measure the mesh and return early when every goal already holds;
//! 3. alternate refinement and coarsening until a pass changes nothing;
//! 4. while the worst cell is below the desired quality, try swaps, then
//!    sliver collapses, and stop as soon as neither helps;
//! 5. report timings.
//!
//! Every operator result is OR-reduced across ranks before it steers the
//! loops, and every statistic is a collective issued on every rank, so all
//! ranks take the same path. Both loops are capped at
//! [`AdaptOpts::max_passes`] passes.

use std::time::{Duration, Instant};

use crate::adapt::diagnostics::{adapt_summary, log_histograms};
use crate::adapt::ops::{AdaptOperators, SimplexOperators};
use crate::adapt::options::{AdaptOpts, Verbosity};
use crate::algs::communicator::Communicator;
use crate::mesh::AdaptMesh;
use crate::mesh_error::MeshAdaptError;
use crate::topology::simplex_mesh::SimplexMesh;

fn is_root<M: AdaptMesh + ?Sized>(mesh: &M) -> bool {
    mesh.comm().rank() == 0
}

/// Whether every goal holds; logs either the "good" line or the goal summary.
fn adapt_check<M: AdaptMesh + ?Sized>(mesh: &M, opts: &AdaptOpts) -> bool {
    let qualities = mesh.ask_qualities();
    let minqual = mesh.global_min(&qualities);
    let maxqual = mesh.global_max(&qualities);
    let lengths = mesh.ask_lengths();
    let minlen = mesh.global_min(&lengths);
    let maxlen = mesh.global_max(&lengths);
    if minqual >= opts.min_quality_desired
        && minlen >= opts.min_length_desired
        && maxlen <= opts.max_length_desired
    {
        if opts.verbosity > Verbosity::Silent && is_root(mesh) {
            log::info!(
                "mesh is good: quality [{minqual},{maxqual}], length [{minlen},{maxlen}]"
            );
        }
        return true;
    }
    if opts.verbosity > Verbosity::Silent {
        adapt_summary(mesh, opts, minqual, maxqual, minlen, maxlen);
    }
    false
}

fn validate<M: AdaptMesh + ?Sized>(mesh: &M, opts: &AdaptOpts) -> Result<(), MeshAdaptError> {
    opts.validate()?;
    let mq = mesh.min_quality();
    if mq < opts.min_quality_allowed && is_root(mesh) {
        log::warn!(
            "worst input element has quality {mq} but minimum allowed is {}",
            opts.min_quality_allowed
        );
    }
    Ok(())
}

/// `Ok(false)` when the mesh already meets every goal.
fn pre_adapt<M: AdaptMesh + ?Sized>(mesh: &M, opts: &AdaptOpts) -> Result<bool, MeshAdaptError> {
    validate(mesh, opts)?;
    if opts.verbosity >= Verbosity::EachAdapt && is_root(mesh) {
        log::info!("before adapting:");
    }
    if adapt_check(mesh, opts) {
        return Ok(false);
    }
    if opts.verbosity >= Verbosity::ExtraStats {
        log_histograms(mesh, opts)?;
    }
    if opts.verbosity >= Verbosity::EachRebuild && is_root(mesh) {
        log::info!("addressing edge lengths");
    }
    Ok(true)
}

fn post_rebuild<M: AdaptMesh + ?Sized>(mesh: &M, opts: &AdaptOpts) {
    if opts.verbosity >= Verbosity::EachRebuild {
        adapt_check(mesh, opts);
    }
}

/// Run `op` and OR its result across ranks.
fn run_op<M, F>(mesh: &mut M, op: F) -> Result<bool, MeshAdaptError>
where
    M: AdaptMesh + ?Sized,
    F: FnOnce(&mut M) -> Result<bool, MeshAdaptError>,
{
    let changed = op(mesh)?;
    Ok(mesh.comm().any(changed))
}

fn satisfy_lengths<M, O>(mesh: &mut M, ops: &mut O, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>
where
    M: AdaptMesh + ?Sized,
    O: AdaptOperators<M> + ?Sized,
{
    let mut changed = false;
    for _ in 0..opts.max_passes {
        let mut did_anything = false;
        if run_op(mesh, |m| ops.refine_by_size(m, opts))? {
            post_rebuild(mesh, opts);
            did_anything = true;
        }
        if run_op(mesh, |m| ops.coarsen_by_size(m, opts))? {
            post_rebuild(mesh, opts);
            did_anything = true;
        }
        changed |= did_anything;
        if !did_anything {
            return Ok(changed);
        }
    }
    if is_root(mesh) {
        log::warn!("edge lengths still changing after {} passes", opts.max_passes);
    }
    Ok(changed)
}

fn satisfy_quality<M, O>(mesh: &mut M, ops: &mut O, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>
where
    M: AdaptMesh + ?Sized,
    O: AdaptOperators<M> + ?Sized,
{
    if mesh.min_quality() >= opts.min_quality_desired {
        return Ok(false);
    }
    if opts.verbosity >= Verbosity::EachRebuild && is_root(mesh) {
        log::info!("addressing element qualities");
    }
    let mut changed = false;
    for _ in 0..opts.max_passes {
        if run_op(mesh, |m| ops.swap_edges(m, opts))? {
            post_rebuild(mesh, opts);
        } else if run_op(mesh, |m| ops.coarsen_slivers(m, opts))? {
            post_rebuild(mesh, opts);
        } else {
            if opts.verbosity > Verbosity::Silent && is_root(mesh) {
                log::info!("could not satisfy quality");
            }
            return Ok(changed);
        }
        changed = true;
        if mesh.min_quality() >= opts.min_quality_desired {
            return Ok(changed);
        }
    }
    if is_root(mesh) {
        log::warn!("quality still below goal after {} passes", opts.max_passes);
    }
    Ok(changed)
}

fn post_adapt<M: AdaptMesh + ?Sized>(
    mesh: &M,
    opts: &AdaptOpts,
    lengths_took: Duration,
    qualities_took: Duration,
    t0: Instant,
) -> Result<(), MeshAdaptError> {
    if opts.verbosity == Verbosity::EachAdapt {
        if is_root(mesh) {
            log::info!("after adapting:");
        }
        adapt_check(mesh, opts);
    }
    if opts.verbosity >= Verbosity::ExtraStats {
        log_histograms(mesh, opts)?;
    }
    if opts.verbosity > Verbosity::Silent && is_root(mesh) {
        log::info!(
            "addressing edge lengths took {:.6} seconds",
            lengths_took.as_secs_f64()
        );
        log::info!(
            "addressing element qualities took {:.6} seconds",
            qualities_took.as_secs_f64()
        );
        log::info!("adapting took {:.6} seconds", t0.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Adapt `mesh` towards the goals in `opts` using `ops`.
///
/// Returns whether the topology changed. This is `false` both when the goals
/// already hold and when they do not but no operator changed anything, so a
/// `false` return does not mean the goals were met. Collective: every rank
/// must call it with the same options.
///
/// # Errors
/// [`MeshAdaptError::InvalidOptions`] when `opts` violates its invariants,
/// before the mesh is touched. Any error from an operator is passed through.
pub fn adapt<M, O>(mesh: &mut M, ops: &mut O, opts: &AdaptOpts) -> Result<bool, MeshAdaptError>
where
    M: AdaptMesh + ?Sized,
    O: AdaptOperators<M> + ?Sized,
{
    let t0 = Instant::now();
    if !pre_adapt(mesh, opts)? {
        return Ok(false);
    }
    let t1 = Instant::now();
    let mut changed = satisfy_lengths(mesh, ops, opts)?;
    let t2 = Instant::now();
    changed |= satisfy_quality(mesh, ops, opts)?;
    let t3 = Instant::now();
    post_adapt(mesh, opts, t2 - t1, t3 - t2, t0)?;
    Ok(changed)
}

/// [`adapt`] with the bundled [`SimplexOperators`].
pub fn adapt_simplex_mesh<C: Communicator>(
    mesh: &mut SimplexMesh<C>,
    opts: &AdaptOpts,
) -> Result<bool, MeshAdaptError> {
    adapt(mesh, &mut SimplexOperators, opts)
}
