// Kept in sync with schema.sql, which bootstraps new databases.

diesel::table! {
    pdb_info (structure_id, chain_id) {
        structure_id -> Text,
        chain_id -> Text,
        title -> Nullable<Text>,
        experimental_technique -> Nullable<Text>,
        release_date -> Nullable<Date>,
        resolution -> Nullable<Double>,
        macromolecule_type -> Nullable<Text>,
        entity_id -> Nullable<Integer>,
        sequence -> Nullable<Text>,
        chain_length -> Nullable<Integer>,
        source -> Nullable<Text>,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    pdb_obsolete (obsolete_id) {
        obsolete_id -> Text,
        obsolete_date -> Date,
        replaced_by -> Nullable<Text>,
    }
}

diesel::table! {
    pdb_analysis_status (pdb_id, stage) {
        pdb_id -> Text,
        stage -> Text,
        completed_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    all_loops (id) {
        id -> Text,
        loop_type -> Text,
        pdb_id -> Text,
        sequential_id -> Integer,
        length -> Integer,
        seq -> Text,
        nt_ids -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    loop_positions (loop_id, nt_id) {
        loop_id -> Text,
        position -> Integer,
        nt_id -> Text,
        bulge -> Bool,
        flanking -> Bool,
    }
}

diesel::table! {
    loop_releases (id) {
        id -> Text,
        created_at -> Timestamp,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    loop_qa (loop_id, release_id) {
        loop_id -> Text,
        release_id -> Text,
        status -> Integer,
        modifications -> Nullable<Text>,
        complementary -> Nullable<Text>,
    }
}

diesel::table! {
    loop_search (loop_id1, loop_id2) {
        loop_id1 -> Text,
        loop_id2 -> Text,
        discrepancy -> Nullable<Double>,
    }
}

diesel::table! {
    unit_pair_interactions (unit_id_1, unit_id_2) {
        unit_id_1 -> Text,
        unit_id_2 -> Text,
        pdb_id -> Text,
        f_lwbp -> Nullable<Text>,
        f_stacks -> Nullable<Text>,
        f_bphs -> Nullable<Text>,
        f_crossing -> Nullable<Integer>,
    }
}

diesel::table! {
    unit_coordinates (unit_id) {
        unit_id -> Text,
        pdb_id -> Text,
        coordinates -> Text,
    }
}

diesel::table! {
    unit_distances (unit_id_1, unit_id_2) {
        unit_id_1 -> Text,
        unit_id_2 -> Text,
        pdb_id -> Text,
        distance -> Double,
    }
}

diesel::table! {
    ml_releases (id, loop_type) {
        id -> Text,
        loop_type -> Text,
        created_at -> Timestamp,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    ml_handles (handle) {
        handle -> Text,
    }
}

diesel::table! {
    ml_motifs (id, release_id) {
        id -> Text,
        release_id -> Text,
        loop_type -> Text,
        handle -> Text,
        version -> Integer,
        comment -> Text,
    }
}

diesel::table! {
    ml_loops (motif_id, loop_id, release_id) {
        motif_id -> Text,
        loop_id -> Text,
        release_id -> Text,
    }
}

diesel::table! {
    ml_parents (motif_id, release_id, parent_motif_id) {
        motif_id -> Text,
        release_id -> Text,
        parent_motif_id -> Text,
    }
}

diesel::table! {
    ml_release_diff (release_id_1, release_id_2, loop_type) {
        release_id_1 -> Text,
        release_id_2 -> Text,
        loop_type -> Text,
        same_groups -> Text,
        updated_groups -> Text,
        added_groups -> Text,
        removed_groups -> Text,
        added_loops -> Text,
        removed_loops -> Text,
        num_same_groups -> Integer,
        num_updated_groups -> Integer,
        num_added_groups -> Integer,
        num_removed_groups -> Integer,
        num_added_loops -> Integer,
        num_removed_loops -> Integer,
    }
}

diesel::table! {
    nr_releases (id) {
        id -> Text,
        created_at -> Timestamp,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    nr_handles (handle) {
        handle -> Text,
    }
}

diesel::table! {
    nr_classes (id, release_id) {
        id -> Text,
        release_id -> Text,
        resolution -> Text,
        handle -> Text,
        version -> Integer,
        comment -> Text,
    }
}

diesel::table! {
    nr_members (class_id, release_id, member_id) {
        class_id -> Text,
        release_id -> Text,
        member_id -> Text,
        representative -> Bool,
    }
}

diesel::table! {
    nr_parents (class_id, release_id, parent_class_id) {
        class_id -> Text,
        release_id -> Text,
        parent_class_id -> Text,
    }
}

diesel::table! {
    nr_release_diff (release_id_1, release_id_2, resolution) {
        release_id_1 -> Text,
        release_id_2 -> Text,
        resolution -> Text,
        same_groups -> Text,
        updated_groups -> Text,
        added_groups -> Text,
        removed_groups -> Text,
        added_members -> Text,
        removed_members -> Text,
        num_same_groups -> Integer,
        num_updated_groups -> Integer,
        num_added_groups -> Integer,
        num_removed_groups -> Integer,
        num_added_members -> Integer,
        num_removed_members -> Integer,
    }
}

diesel::joinable!(loop_positions -> all_loops (loop_id));
diesel::joinable!(loop_qa -> all_loops (loop_id));
diesel::joinable!(loop_qa -> loop_releases (release_id));
diesel::joinable!(ml_loops -> all_loops (loop_id));

diesel::allow_tables_to_appear_in_same_query!(
    pdb_info,
    pdb_obsolete,
    pdb_analysis_status,
    all_loops,
    loop_positions,
    loop_releases,
    loop_qa,
    loop_search,
    unit_pair_interactions,
    unit_coordinates,
    unit_distances,
    ml_releases,
    ml_handles,
    ml_motifs,
    ml_loops,
    ml_parents,
    ml_release_diff,
    nr_releases,
    nr_handles,
    nr_classes,
    nr_members,
    nr_parents,
    nr_release_diff,
);
