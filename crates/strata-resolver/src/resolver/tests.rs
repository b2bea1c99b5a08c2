use std::{sync::Arc, thread, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::ResolverConfig,
    depended::{DependedSession, ResolveSession, TowerContext},
    error::ResolveError,
    id::{FileId, ModuleId},
    phase::Phase,
    session::{InvalidationScope, ModuleKind},
    structure::StructureKey,
    syntax::DeclarationKind,
    test::*,
};

use TestPhase::*;

#[test]
fn resolves_single_class_through_every_phase() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "ClassA");
    world.syntax(0).class(&a);

    let slice = world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();

    assert_eq!(world.producer.calls(&a, HeaderResolved), 1);
    assert_eq!(world.producer.calls(&a, MembersResolved), 1);
    assert_eq!(slice.phase(), MembersResolved);

    let session = world.session(0);
    let node = session.node(&a).unwrap();
    let generation = session.node_generation(node.file());

    assert_eq!(node.phase(), MembersResolved);
    assert_eq!(
        node.read(HeaderResolved, generation).unwrap().latest(),
        "header:ClassA@0[]"
    );
    assert_eq!(node.read(Raw, generation).unwrap().latest(), "raw:ClassA@0");
}

#[test]
fn second_request_does_no_work() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let (first, stats) = world.resolver.resolve_traced(&a, MembersResolved).unwrap();
    assert_eq!(stats.steps, 2);

    let (second, stats) = world.resolver.resolve_traced(&a, MembersResolved).unwrap();
    assert_eq!(stats.steps, 0);

    assert!(first.ptr_eq(&second));
    assert_eq!(world.producer.total(), 2);
}

#[test]
fn never_skips_a_phase() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();

    assert_eq!(world.producer.history(&a), [HeaderResolved, MembersResolved]);
}

#[test]
fn lower_phase_is_served_from_cache() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    let header = world.resolver.resolve_to_phase(&a, HeaderResolved).unwrap();

    assert_eq!(header.phase(), HeaderResolved);
    assert_eq!(header.get(MembersResolved), None);
    assert_eq!(world.producer.total(), 2);
}

#[test]
fn dependencies_are_resolved_first() {
    let world = TestWorld::new(&[0]);
    let (a, b) = (decl(0, "A"), decl(0, "B"));
    let syntax = world.syntax(0);
    syntax.class(&a);
    syntax.class(&b);
    syntax.depend(&a, HeaderResolved, &b, MembersResolved);

    let slice = world.resolver.resolve_to_phase(&a, HeaderResolved).unwrap();

    assert_eq!(slice.latest(), "header:A@0[B]");
    assert_eq!(world.session(0).node(&b).unwrap().phase(), MembersResolved);
    assert_eq!(world.session(0).node(&a).unwrap().phase(), HeaderResolved);
    assert_eq!(world.producer.calls(&a, MembersResolved), 0);
}

#[test]
fn mutual_dependency_is_a_cycle() {
    let world = TestWorld::new(&[0]);
    let (a, b) = (decl(0, "A"), decl(0, "B"));
    let syntax = world.syntax(0);
    syntax.class(&a);
    syntax.class(&b);
    syntax.depend(&a, MembersResolved, &b, MembersResolved);
    syntax.depend(&b, MembersResolved, &a, MembersResolved);

    let err = world
        .resolver
        .resolve_to_phase(&a, MembersResolved)
        .unwrap_err();

    let ResolveError::CyclicResolution { cycle, .. } = &err else {
        panic!("expected a cycle, got {err:?}");
    };
    assert_eq!(cycle.path(), [a.clone(), b.clone(), a.clone()]);

    // The failed step left both nodes where they were.
    let session = world.session(0);
    assert_eq!(session.node(&a).unwrap().phase(), HeaderResolved);
    assert_eq!(session.node(&b).unwrap().phase(), HeaderResolved);
    assert_eq!(world.producer.calls(&a, MembersResolved), 0);
}

#[test]
fn self_dependency_is_a_cycle() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);
    world.syntax(0).depend(&a, HeaderResolved, &a, HeaderResolved);

    let err = world
        .resolver
        .resolve_to_phase(&a, HeaderResolved)
        .unwrap_err();

    assert!(err.is_cycle());
}

#[test]
fn dependencies_on_lower_phases_are_not_cycles() {
    let world = TestWorld::new(&[0]);
    let (a, b) = (decl(0, "A"), decl(0, "B"));
    let syntax = world.syntax(0);
    syntax.class(&a);
    syntax.class(&b);
    syntax.depend(&a, MembersResolved, &b, HeaderResolved);
    syntax.depend(&b, MembersResolved, &a, HeaderResolved);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.resolver.resolve_to_phase(&b, MembersResolved).unwrap();

    assert_eq!(world.producer.total(), 4);
}

#[test]
fn producer_failure_keeps_phase_and_retries() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);
    world.syntax(0).fail_at(&a, Some(MembersResolved));

    for attempt in 1..=2 {
        let err = world
            .resolver
            .resolve_to_phase(&a, MembersResolved)
            .unwrap_err();

        assert!(matches!(
            &err,
            ResolveError::ProducerFailure { id, phase: "members", source }
                if *id == a && source.message() == "malformed `A`"
        ));
        assert_eq!(world.session(0).node(&a).unwrap().phase(), HeaderResolved);
        assert_eq!(world.producer.calls(&a, MembersResolved), attempt);
    }

    world.syntax(0).fail_at(&a, None);
    world.edit(&a);

    let slice = world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    assert_eq!(slice.latest(), "members:A@1[]");
}

#[test]
fn content_edit_reruns_producers() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let before = world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.edit(&a);
    let after = world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();

    assert_eq!(before.latest(), "members:A@0[]");
    assert_eq!(after.latest(), "members:A@1[]");
    assert_eq!(world.producer.calls(&a, HeaderResolved), 2);
    assert_eq!(world.producer.history(&a), [
        HeaderResolved,
        MembersResolved,
        HeaderResolved,
        MembersResolved
    ]);
}

#[test]
fn unreported_edits_are_not_observed() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.syntax(0).edit(&a);

    let slice = world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    assert_eq!(slice.latest(), "members:A@0[]");
    assert_eq!(world.producer.total(), 2);
}

#[test]
fn invalidation_is_lazy() {
    let world = TestWorld::new(&[0]);
    let (a, b) = (decl(0, "A"), decl(0, "B"));
    world.syntax(0).class(&a);
    world.syntax(0).class(&b);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.resolver.resolve_to_phase(&b, MembersResolved).unwrap();

    let session = world.session(0);
    session.invalidate(InvalidationScope::Module);

    // Nothing was reset yet, the nodes only notice on access.
    assert_eq!(session.node(&b).unwrap().phase(), MembersResolved);

    world.resolver.resolve_to_phase(&a, HeaderResolved).unwrap();

    assert_eq!(world.producer.calls(&a, HeaderResolved), 2);
    assert_eq!(world.producer.calls(&b, HeaderResolved), 1);
    assert_eq!(session.node(&a).unwrap().phase(), HeaderResolved);
}

#[test]
fn cross_module_dependency_is_resolved() {
    let world = TestWorld::new(&[0, 1]);
    let (a, b) = (decl(0, "A"), decl(1, "B"));
    world.syntax(0).class(&a);
    world.syntax(1).class(&b);
    world.syntax(0).depend(&a, MembersResolved, &b, MembersResolved);

    let slice = world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();

    assert_eq!(slice.latest(), "members:A@0[B]");
    assert_eq!(world.session(1).node(&b).unwrap().phase(), MembersResolved);
    assert!(world.session(0).node(&b).is_none());
}

#[test]
fn unknown_module_is_reported() {
    let world = TestWorld::new(&[0]);
    let missing = decl(9, "X");

    let err = world
        .resolver
        .resolve_to_phase(&missing, HeaderResolved)
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::UnresolvedModule { module, id: Some(id) }
            if module == ModuleId::new(9) && id == missing
    ));
}

#[test]
fn unknown_declaration_is_reported() {
    let world = TestWorld::new(&[0]);
    let missing = decl(0, "Missing");

    let err = world
        .resolver
        .resolve_to_phase(&missing, HeaderResolved)
        .unwrap_err();

    assert!(matches!(err, ResolveError::UnknownDeclaration(id) if id == missing));
    assert_eq!(world.session(0).node_count(), 0);
}

#[test]
fn removed_declaration_is_evicted() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.syntax(0).remove(&a);
    world.content(0).increment();

    let err = world
        .resolver
        .resolve_to_phase(&a, HeaderResolved)
        .unwrap_err();

    assert!(matches!(err, ResolveError::UnknownDeclaration(_)));
    assert!(world.session(0).node(&a).is_none());
}

#[test]
fn edits_reach_dependent_modules_only() {
    let world = TestWorld::new(&[0, 1, 2]);
    world.depends(0, &[1]);

    let (a, b, c) = (decl(0, "A"), decl(1, "B"), decl(2, "C"));
    world.syntax(0).class(&a);
    world.syntax(1).class(&b);
    world.syntax(2).class(&c);

    for id in [&a, &b, &c] {
        world.resolver.resolve_to_phase(id, MembersResolved).unwrap();
    }

    world.edit(&b);

    for id in [&a, &b, &c] {
        world.resolver.resolve_to_phase(id, MembersResolved).unwrap();
    }

    assert_eq!(world.producer.calls(&a, HeaderResolved), 2);
    assert_eq!(world.producer.calls(&b, HeaderResolved), 2);
    assert_eq!(world.producer.calls(&c, HeaderResolved), 1);
}

#[test]
fn file_invalidation_only_resets_that_file() {
    let world = TestWorld::new(&[0]);
    let (a, b) = (decl(0, "A"), decl(0, "B"));
    world.syntax(0).declare(&a, FILE, DeclarationKind::Class);
    world.syntax(0).declare(&b, OTHER_FILE, DeclarationKind::Class);

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.resolver.resolve_to_phase(&b, MembersResolved).unwrap();

    let session = world.session(0);
    let generation = session.generation();
    session.invalidate(InvalidationScope::File(FILE));

    world.resolver.resolve_to_phase(&a, MembersResolved).unwrap();
    world.resolver.resolve_to_phase(&b, MembersResolved).unwrap();

    assert_eq!(session.generation(), generation);
    assert_eq!(world.producer.calls(&a, MembersResolved), 2);
    assert_eq!(world.producer.calls(&b, MembersResolved), 1);
}

#[test]
fn structure_change_clears_structure_cache() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let key = StructureKey::File(ModuleId::new(0), FILE);
    world.resolver.get_scope(&key).unwrap();

    let session = world.session(0);
    assert_eq!(session.cached_structure_count(), 1);
    assert_eq!(session.cached_scope_count(), 1);

    world.structure.increment();
    assert_eq!(
        world.invalidation.check_and_invalidate(&session),
        Some(InvalidationScope::Structure)
    );

    assert_eq!(session.generation(), 1);
    assert_eq!(session.cached_structure_count(), 0);
    assert_eq!(session.cached_scope_count(), 0);
    assert_eq!(world.invalidation.check_and_invalidate(&session), None);
}

#[test]
fn content_change_keeps_structure_cache() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let key = StructureKey::File(ModuleId::new(0), FILE);
    world.resolver.get_scope(&key).unwrap();

    let session = world.session(0);
    world.content(0).increment();

    assert_eq!(
        world.invalidation.check_and_invalidate(&session),
        Some(InvalidationScope::Module)
    );
    assert_eq!(session.cached_structure_count(), 1);
    assert_eq!(session.cached_scope_count(), 0);
}

#[test]
fn scopes_group_overloads() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    let syntax = world.syntax(0);
    syntax.class(&a);
    syntax.declare(&a.nested("x"), FILE, DeclarationKind::Property);
    syntax.declare(&a.nested("f"), FILE, DeclarationKind::Function);
    syntax.declare(&a.nested("f").with_index(1), FILE, DeclarationKind::Function);

    let scope = world
        .resolver
        .get_scope(&StructureKey::Class(a.clone()))
        .unwrap();

    assert_eq!(scope.len(), 2);
    assert_eq!(scope.lookup("f").len(), 2);
    assert_eq!(scope.first("x"), Some(&a.nested("x")));
    assert!(scope.lookup("missing").is_empty());

    let file = world
        .resolver
        .get_scope(&StructureKey::File(ModuleId::new(0), FILE))
        .unwrap();
    assert_eq!(file.names().map(|name| name.as_str()).collect::<Vec<_>>(), ["A"]);
}

#[test]
fn scope_follows_syntax_changes() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let key = StructureKey::Class(a.clone());
    assert!(world.resolver.get_scope(&key).unwrap().is_empty());

    world
        .syntax(0)
        .declare(&a.nested("y"), FILE, DeclarationKind::Property);

    assert!(world.resolver.get_scope(&key).unwrap().contains("y"));
}

#[test]
fn scope_cache_is_bounded() {
    let config = ResolverConfig {
        scope_cache_capacity: Some(2),
        ..ResolverConfig::default()
    };
    let world = TestWorld::build(&[0], config, TestProducer::default());

    let classes = ["A", "B", "C"].map(|name| decl(0, name));
    for class in &classes {
        world.syntax(0).class(class);
    }

    let session = world.session(0);
    for class in &classes {
        session.get_scope(&StructureKey::Class(class.clone())).unwrap();
    }

    assert_eq!(session.cached_scope_count(), 2);
}

#[test]
fn resolves_class_with_members() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    let (x, y) = (a.nested("x"), a.nested("y"));
    let syntax = world.syntax(0);
    syntax.class(&a);
    syntax.declare(&x, FILE, DeclarationKind::Property);
    syntax.declare(&y, FILE, DeclarationKind::Function);

    let class = world.resolver.resolve_with_members(&a, MembersResolved).unwrap();

    assert_eq!(class.class.phase(), MembersResolved);
    assert_eq!(class.members.len(), 2);
    assert!(class
        .members
        .values()
        .all(|member| member.phase() == MembersResolved));
    assert_eq!(class.members_named("y").count(), 1);

    // The header is done before any member starts.
    let header_done = world.producer.position(&a, MembersResolved).unwrap();
    for member in [&x, &y] {
        assert!(world.producer.position(member, HeaderResolved).unwrap() > header_done);
    }
    assert_eq!(world.producer.history(&x), [HeaderResolved, MembersResolved]);
}

#[test]
fn depth_limit_stops_long_chains() {
    let config = ResolverConfig {
        max_depth: 3,
        ..ResolverConfig::default()
    };
    let world = TestWorld::build(&[0], config, TestProducer::default());

    let chain = (0..6).map(|i| decl(0, &format!("D{i}"))).collect::<Vec<_>>();
    for id in &chain {
        world.syntax(0).class(id);
    }
    for pair in chain.windows(2) {
        world
            .syntax(0)
            .depend(&pair[0], HeaderResolved, &pair[1], HeaderResolved);
    }

    let err = world
        .resolver
        .resolve_to_phase(&chain[0], HeaderResolved)
        .unwrap_err();

    assert!(matches!(err, ResolveError::DepthLimit { limit: 3, .. }));
    assert!(world
        .session(0)
        .node(&chain[0])
        .is_some_and(|node| node.phase() == Raw));
}

#[test]
fn immutable_modules_are_not_watched() {
    let mut world = TestWorld::new(&[0]);
    let builtins = world.add_module(ModuleId::new(5), ModuleKind::Builtins);

    assert!(!world.invalidation.is_registered(builtins.id()));
    assert!(world.invalidation.is_registered(world.session(0).id()));
}

#[test]
fn concurrent_requests_share_one_step() {
    let world = TestWorld::build(
        &[0],
        ResolverConfig::default(),
        TestProducer::with_delay(Duration::from_millis(10)),
    );
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let slices = thread::scope(|s| {
        let handles = (0..8)
            .map(|_| s.spawn(|| world.resolver.resolve_to_phase(&a, MembersResolved)))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(world.producer.calls(&a, HeaderResolved), 1);
    assert_eq!(world.producer.calls(&a, MembersResolved), 1);
    assert!(slices.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
}

#[test]
fn concurrent_node_creation_yields_one_node() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);
    let session = world.session(0);

    let nodes = thread::scope(|s| {
        let handles = (0..8)
            .map(|_| s.spawn(|| session.get_or_create_node(&a).unwrap()))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert!(nodes.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(session.node_count(), 1);
}

#[test]
fn stress_random_dependency_graphs() {
    const DECLARATIONS: usize = 40;
    const THREADS: usize = 8;
    const REQUESTS: usize = 30;

    let world = TestWorld::new(&[0, 1]);
    let mut rng = StdRng::seed_from_u64(7);

    let ids = (0..DECLARATIONS)
        .map(|i| decl((i % 2) as u32, &format!("D{i}")))
        .collect::<Vec<_>>();

    for id in &ids {
        world.syntax(id.module.id()).class(id);
    }

    // Steps are ordered by (phase, index) and only depend on lower steps.
    // Declarations may depend on each other both ways, the steps never do.
    for (i, id) in ids.iter().enumerate() {
        for _ in 0..rng.gen_range(0..=3) {
            let target = rng.gen_range(0..DECLARATIONS);
            if target == i {
                continue;
            }

            let at = rng.gen_range(1..TestPhase::COUNT);
            let phase = if target < i {
                rng.gen_range(0..=at)
            } else {
                rng.gen_range(0..at)
            };

            world.syntax(id.module.id()).depend(
                id,
                TestPhase::from_position(at).unwrap(),
                &ids[target],
                TestPhase::from_position(phase).unwrap(),
            );
        }
    }

    let plans = (0..THREADS)
        .map(|_| {
            (0..REQUESTS)
                .map(|_| {
                    let id = ids[rng.gen_range(0..DECLARATIONS)].clone();
                    let phase = TestPhase::from_position(rng.gen_range(0..TestPhase::COUNT)).unwrap();
                    (id, phase)
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let world = &world;
    thread::scope(|s| {
        for plan in &plans {
            s.spawn(move || {
                for (id, phase) in plan {
                    let slice = world.resolver.resolve_to_phase(id, *phase).unwrap();
                    assert_eq!(slice.phase(), *phase);
                    assert_eq!(slice.id(), id);
                }
            });
        }
    });

    for ((id, phase), calls) in world.producer.calls_snapshot() {
        assert_eq!(calls, 1, "`{id}` entered {phase} {calls} times");
    }

    for plan in &plans {
        for (id, phase) in plan {
            let node = world.session(id.module.id()).node(id).unwrap();
            assert!(node.phase() >= *phase);
        }
    }
}

#[test]
fn cross_thread_cycle_terminates() {
    let world = TestWorld::build(
        &[0],
        ResolverConfig::default(),
        TestProducer::with_delay(Duration::from_millis(20)),
    );
    let (a, b) = (decl(0, "A"), decl(0, "B"));
    let syntax = world.syntax(0);
    syntax.class(&a);
    syntax.class(&b);
    syntax.depend(&a, MembersResolved, &b, MembersResolved);
    syntax.depend(&b, MembersResolved, &a, MembersResolved);

    let results = thread::scope(|s| {
        let first = s.spawn(|| world.resolver.resolve_to_phase(&a, MembersResolved));
        let second = s.spawn(|| world.resolver.resolve_to_phase(&b, MembersResolved));

        [first.join().unwrap(), second.join().unwrap()]
    });

    for result in results {
        assert!(result.is_err_and(|err| err.is_cycle()));
    }
}

#[test]
fn concurrent_requests_through_mutual_declarations_succeed() {
    for _ in 0..5 {
        let world = TestWorld::build(
            &[0],
            ResolverConfig::default(),
            TestProducer::with_delay(Duration::from_millis(50)),
        );
        let (x, y) = (decl(0, "X"), decl(0, "Y"));
        let syntax = world.syntax(0);
        syntax.class(&x);
        syntax.class(&y);
        syntax.depend(&x, HeaderResolved, &y, HeaderResolved);
        syntax.depend(&y, MembersResolved, &x, HeaderResolved);

        let (members, header) = thread::scope(|s| {
            let members = s.spawn(|| world.resolver.resolve_to_phase(&y, MembersResolved));
            thread::sleep(Duration::from_millis(10));
            let header = s.spawn(|| world.resolver.resolve_to_phase(&x, HeaderResolved));

            (members.join().unwrap(), header.join().unwrap())
        });

        assert_eq!(members.unwrap().phase(), MembersResolved);
        assert_eq!(header.unwrap().phase(), HeaderResolved);
        assert_eq!(world.producer.calls(&x, HeaderResolved), 1);
        assert_eq!(world.producer.calls(&y, HeaderResolved), 1);
        assert_eq!(world.producer.calls(&y, MembersResolved), 1);
    }
}

#[test]
fn depended_session_follows_tower_file_invalidation() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let fragment_file = FileId::new(7);
    let fragment = Arc::new(TestSyntax::default());
    let f = decl(0, "Fragment");
    fragment.declare(&f, fragment_file, DeclarationKind::Function);
    fragment.depend(&f, HeaderResolved, &a, HeaderResolved);

    let session = ResolveSession::from(DependedSession::new(
        world.session(0),
        fragment,
        fragment_file,
        TowerContext::new([StructureKey::File(ModuleId::new(0), FILE)]),
        &world.config,
    ));

    world.resolver.resolve_in(&session, &f, HeaderResolved).unwrap();
    assert_eq!(world.producer.calls(&f, HeaderResolved), 1);

    // Files outside the tower leave the fragment alone.
    world.session(0).invalidate(InvalidationScope::File(OTHER_FILE));
    world.resolver.resolve_in(&session, &f, HeaderResolved).unwrap();
    assert_eq!(world.producer.calls(&f, HeaderResolved), 1);

    world.session(0).invalidate(InvalidationScope::File(FILE));
    world.resolver.resolve_in(&session, &f, HeaderResolved).unwrap();
    assert_eq!(world.producer.calls(&f, HeaderResolved), 2);
    assert_eq!(world.producer.calls(&a, HeaderResolved), 2);
}

#[test]
fn depended_session_resolves_fragment_against_original() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let fragment_file = FileId::new(7);
    let fragment = Arc::new(TestSyntax::default());
    let f = decl(0, "Fragment");
    fragment.declare(&f, fragment_file, DeclarationKind::Function);
    fragment.depend(&f, HeaderResolved, &a, HeaderResolved);

    let depended = DependedSession::new(
        world.session(0),
        fragment,
        fragment_file,
        TowerContext::new([StructureKey::File(ModuleId::new(0), FILE)]),
        &world.config,
    );
    let session = ResolveSession::from(depended);

    let slice = world
        .resolver
        .resolve_in(&session, &f, MembersResolved)
        .unwrap();
    assert_eq!(slice.phase(), MembersResolved);

    let ResolveSession::Depended(depended) = &session else {
        unreachable!()
    };

    assert!(world.session(0).node(&f).is_none());
    assert_eq!(depended.fragment().node(&f).unwrap().phase(), MembersResolved);
    assert_eq!(world.session(0).node(&a).unwrap().phase(), HeaderResolved);

    assert_eq!(depended.lookup(&world.resolver, "A").unwrap(), [a.clone()]);
    assert_eq!(depended.lookup(&world.resolver, "Fragment").unwrap(), [f.clone()]);
    assert!(depended.lookup(&world.resolver, "Nope").unwrap().is_empty());

    assert!(Arc::ptr_eq(
        session.session_for(&f).unwrap(),
        depended.fragment()
    ));
    assert!(Arc::ptr_eq(
        session.session_for(&a).unwrap(),
        depended.original()
    ));

    // An edit of the original only reaches the fragment once the original moved.
    world.edit(&a);
    world.resolver.resolve_to_phase(&a, HeaderResolved).unwrap();
    world
        .resolver
        .resolve_in(&session, &f, MembersResolved)
        .unwrap();

    assert_eq!(world.producer.calls(&f, HeaderResolved), 2);
}

#[test]
fn resolvable_session_routes_to_itself() {
    let world = TestWorld::new(&[0]);
    let a = decl(0, "A");
    world.syntax(0).class(&a);

    let session = ResolveSession::from(world.session(0));

    let slice = world
        .resolver
        .resolve_in(&session, &a, HeaderResolved)
        .unwrap();

    assert_eq!(slice.phase(), HeaderResolved);
    assert_eq!(session.module(), ModuleId::new(0));
    assert!(session.session_for(&decl(1, "B")).is_none());
    assert!(session
        .get_scope(&world.resolver, &StructureKey::File(ModuleId::new(0), FILE))
        .unwrap()
        .contains("A"));
}
