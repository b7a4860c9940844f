// integrator.rs
// Explicit Euler update, split in two passes. Positions advance for the whole
// replicated population from current velocities; velocities advance only for
// the owned range from the freshly accumulated forces. The position pass must
// run after the previous step's velocity gather has been awaited, so every
// rank moves every particle with identical velocities.

use rayon::prelude::*;
use std::ops::Range;
use ultraviolet::DVec2;

use crate::population::Population;
use crate::profile_scope;

pub fn integrate(population: &mut Population, forces: &[DVec2], owned: Range<usize>, dt: f64) {
    profile_scope!("integration");

    population
        .pos
        .par_iter_mut()
        .zip(population.vel.par_iter())
        .for_each(|(p, v)| *p += *v * dt);

    if owned.is_empty() {
        return;
    }
    let start = owned.start;
    let weight = &population.weight;
    population.vel[owned]
        .par_iter_mut()
        .enumerate()
        .for_each(|(k, v)| {
            let i = start + k;
            *v += forces[i] * (dt / weight[i]);
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_particles() -> Population {
        Population::new(
            vec![1.0, 2.0],
            vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)],
            vec![DVec2::new(0.5, 0.0), DVec2::new(0.0, -1.0)],
        )
    }

    #[test]
    fn positions_move_with_pre_update_velocities() {
        let mut pop = two_particles();
        let forces = vec![DVec2::new(1.0, 0.0); 2];
        integrate(&mut pop, &forces, 0..2, 2.0);
        // positions use the old velocities, not the post-kick ones
        assert_eq!(pop.pos[0], DVec2::new(1.0, 0.0));
        assert_eq!(pop.pos[1], DVec2::new(1.0, -2.0));
    }

    #[test]
    fn velocity_kick_scales_with_inverse_weight() {
        let mut pop = two_particles();
        let forces = vec![DVec2::new(1.0, 0.0), DVec2::new(1.0, 0.0)];
        integrate(&mut pop, &forces, 0..2, 2.0);
        assert_eq!(pop.vel[0], DVec2::new(2.5, 0.0)); // 0.5 + 1*2/1
        assert_eq!(pop.vel[1], DVec2::new(1.0, -1.0)); // 0.0 + 1*2/2
    }

    #[test]
    fn velocities_outside_the_owned_range_are_untouched() {
        let mut pop = two_particles();
        let before = pop.vel[0];
        let forces = vec![DVec2::new(1.0, 0.0); 2];
        integrate(&mut pop, &forces, 1..2, 1.0);
        assert_eq!(pop.vel[0], before);
        assert_ne!(pop.vel[1], DVec2::new(0.0, -1.0));
    }

    #[test]
    fn empty_range_still_moves_positions() {
        let mut pop = two_particles();
        integrate(&mut pop, &[], 0..0, 1.0);
        assert_eq!(pop.pos[0], DVec2::new(0.5, 0.0));
        assert_eq!(pop.vel[0], DVec2::new(0.5, 0.0));
    }
}
