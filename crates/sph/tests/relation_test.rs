//! Neighbor relation construction from the reference cell-linked list.

use sph::{
    BaseParticles, CellLinkedList, ContactRelation, Dimension, InnerRelation, Kernel, Real, Vecd,
};

fn jittered_block(nx: usize, ny: usize, dp: Real, origin: Vecd) -> BaseParticles {
    let kernel = Kernel::new(1.3 * dp).unwrap();
    let mut positions = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            // Deterministic jitter so distances are not all lattice values.
            let jitter = 0.1 * dp * (((i * 7 + j * 13) % 5) as Real - 2.0) / 2.0;
            let offset = Vecd::new(i as Real * dp + jitter, j as Real * dp - jitter, 0.0);
            positions.push(origin + offset);
        }
    }
    BaseParticles::with_uniform_volume(kernel, Dimension::Two, positions, dp * dp).unwrap()
}

#[test]
fn test_rebuild_is_idempotent() {
    let body = jittered_block(12, 9, 0.05, Vecd::ZERO);
    let lists = CellLinkedList::new(&body).unwrap().inner_lists();

    let mut inner = InnerRelation::new(&body);
    inner.update_configuration(&body, &lists).unwrap();
    let first = inner.configuration().to_vec();
    inner.update_configuration(&body, &lists).unwrap();
    assert_eq!(inner.configuration(), first.as_slice());
}

#[test]
fn test_inner_relation_is_symmetric() {
    let body = jittered_block(10, 10, 0.1, Vecd::ZERO);
    let lists = CellLinkedList::new(&body).unwrap().inner_lists();
    let mut inner = InnerRelation::new(&body);
    inner.update_configuration(&body, &lists).unwrap();

    for i in 0..inner.len() {
        for entry in inner.neighborhood(i).iter() {
            let back = inner
                .neighborhood(entry.index_j)
                .iter()
                .find(|e| e.index_j == i)
                .unwrap_or_else(|| panic!("{} lists {} but not the reverse", i, entry.index_j));
            assert_eq!(back.r_ij, entry.r_ij);
            assert_eq!(back.dw_ijv_j, entry.dw_ijv_j);
            assert!((back.e_ij + entry.e_ij).length() < 1e-12);
            assert!(entry.r_ij < body.kernel().cutoff_radius());
        }
    }
}

#[test]
fn test_contact_relation_uses_contact_volumes() {
    let dp = 0.1;
    let left = jittered_block(4, 4, dp, Vecd::ZERO);
    let right_kernel = *left.kernel();
    let right_positions = (0..4)
        .flat_map(|j| (0..2).map(move |i| Vecd::new(0.4 + i as Real * dp, j as Real * dp, 0.0)))
        .collect();
    // Twice the volume of the left body's particles.
    let right = BaseParticles::with_uniform_volume(
        right_kernel,
        Dimension::Two,
        right_positions,
        2.0 * dp * dp,
    )
    .unwrap();

    let left_positions = left.variable::<Vecd>(sph::names::POSITION).unwrap();
    let lists = CellLinkedList::new(&right).unwrap().contact_lists(left_positions);
    let mut contact = ContactRelation::new(&left, "right");
    contact.update_configuration(&right, &lists).unwrap();

    assert_eq!(contact.contact_body(), "right");
    assert_eq!(contact.len(), left.total_real_particles());
    // Leftmost column is more than 2h away from the right body.
    assert!(contact.neighborhood(0).is_empty());

    let kernel = left.kernel();
    let mut touched = 0;
    for i in 0..contact.len() {
        for entry in contact.neighborhood(i).iter() {
            let expected = kernel.dw(Dimension::Two, entry.r_ij) * 2.0 * dp * dp;
            assert!((entry.dw_ijv_j - expected).abs() < 1e-12);
            touched += 1;
        }
    }
    assert!(touched > 0);
}

#[test]
fn test_contact_relation_rejects_foreign_ids() {
    let left = jittered_block(3, 3, 0.1, Vecd::ZERO);
    let right = jittered_block(2, 2, 0.1, Vecd::new(0.3, 0.0, 0.0));
    // Inner lists of the left body index the wrong body.
    let lists = CellLinkedList::new(&left).unwrap().inner_lists();
    let mut contact = ContactRelation::new(&left, "right");
    assert!(contact.update_configuration(&right, &lists).is_err());
}
