use proptest::prelude::*;
use stackplan_model::{CapacityError, PlanError, SubnetGroupRequest, SubnetKind};
use stackplan_planner::network::NetworkResolver;
use stackplan_planner::prelude::*;
use stackplan_test_utils as fixtures;

fn sidecar(index: usize, mib: u32) -> ContainerRequest {
    ContainerRequest::registry(format!("sidecar{index}"), "busybox:1.36").memory_mib(mib)
}

proptest! {
    #[test]
    fn prop_memory_overcommit_fails_in_any_order(
        a in 1u32..=512,
        b in 1u32..=512,
        web_first in any::<bool>(),
    ) {
        prop_assume!(a + b > 512);

        let mut containers = vec![sidecar(0, a), sidecar(1, b)];
        if web_first {
            containers.insert(0, fixtures::web_container());
        } else {
            containers.push(fixtures::web_container());
        }
        let forward = containers.clone();
        containers.reverse();

        for order in [forward, containers] {
            let mut task = TaskDefinitionRequest::new("TaskDef", 256, 512);
            for container in order {
                task = task.container(container);
            }
            let mut builder = PlanBuilder::new("demo");
            builder.add_task_definition(task);

            let err = builder.validate().unwrap_err();
            prop_assert!(
                matches!(err, PlanError::Capacity(CapacityError::MemorySumExceedsTask { .. })),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn prop_log_channel_retention_conflict(
        first in prop::sample::select(LogRetention::SUPPORTED_DAYS.to_vec()),
        second in prop::sample::select(LogRetention::SUPPORTED_DAYS.to_vec()),
    ) {
        prop_assume!(first != second);

        let task = TaskDefinitionRequest::new("TaskDef", 256, 512)
            .container(
                fixtures::web_container()
                    .log_to(LogChannelRequest::new("shared").retention(LogRetention::Days(first))),
            )
            .container(
                ContainerRequest::registry("agent", "datadog/agent")
                    .log_to(LogChannelRequest::new("shared").retention(LogRetention::Days(second))),
            );
        let mut builder = PlanBuilder::new("demo");
        builder.add_task_definition(task);

        let err = builder.validate().unwrap_err();
        prop_assert!(err.is_conflict(), "unexpected error: {err}");
    }

    #[test]
    fn prop_subnets_never_overlap(
        third_octet in 0u8..=255,
        prefix in 16u8..=24,
        azs in 1u8..=3,
        public_groups in 0usize..=2,
        private_groups in 0usize..=2,
    ) {
        prop_assume!(public_groups + private_groups > 0);

        let mut groups = Vec::new();
        for i in 0..public_groups {
            groups.push(SubnetGroupRequest::new(format!("public{i}"), SubnetKind::Public));
        }
        for i in 0..private_groups {
            groups.push(SubnetGroupRequest::new(format!("private{i}"), SubnetKind::Private));
        }

        let host_bits = 32 - u32::from(prefix);
        let base = (u32::from(third_octet) << 8) >> host_bits << host_bits;
        let cidr = format!("10.{}.{}.0/{prefix}", base >> 8 & 0xff, base & 0xff);
        let request = NetworkRequest::with_cidr("Vpc", cidr).max_azs(azs).subnet_groups(groups);

        let network = NetworkResolver::new().resolve(&request).unwrap();
        let layout = network.subnets().unwrap();
        let subnets: Vec<_> = layout.iter().collect();

        prop_assert_eq!(layout.public.len(), public_groups * usize::from(azs));
        prop_assert_eq!(layout.private.len(), private_groups * usize::from(azs));
        for (i, a) in subnets.iter().enumerate() {
            for b in &subnets[i + 1..] {
                prop_assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.cidr, b.cidr);
            }
        }
    }

    #[test]
    fn prop_synthesis_is_idempotent(desired_count in 0i64..=20, rollback in any::<bool>()) {
        let mut builder = PlanBuilder::new(fixtures::STACK_NAME);
        builder
            .add_network(fixtures::network())
            .add_cluster(ClusterRequest::new(fixtures::CLUSTER_ID, fixtures::NETWORK_ID))
            .add_secret(SecretRequest::new(fixtures::SECRET_ID, "web-stack/api-key"))
            .add_task_definition(fixtures::task_definition())
            .add_service(fixtures::service().desired_count(desired_count).rollback(rollback));
        let plan = builder.validate().unwrap();

        let synthesizer = Synthesizer::new();
        let first = synthesizer.synthesize(&plan).unwrap().to_json_pretty().unwrap();
        let second = synthesizer.synthesize(&plan).unwrap().to_json_pretty().unwrap();
        prop_assert_eq!(first, second);
    }
}
