//! Log-Analytics Deployment Profile
//!
//! The composer's documented multi-tier deployment: a log transport queue
//! pair, a clustered search tier behind an internal balancer, a public
//! dashboard tier, a queue-depth-scaled indexer tier and a single-instance
//! scheduler tier, plus log-shipper credentials for external publishers.
//!
//! Resource, parameter and output names here are load-bearing: operators
//! and dependent compositions (see [`crate::profiles::access`]) reference
//! them by name.

use serde::Deserialize;
use serde_json::{json, Value as Json};

use crate::compose::{
    pair_security_groups, wire_thresholds, Assembler, BootstrapBuilder, BuiltTiers, GroupEndpoint,
    MetricRef, NetworkContext, PortRange, ThresholdScalingConfig, TierBuilder, TierHandles,
    REGION_AMI_MAPPING,
};
use crate::compose::tier::{AsgSpec, InstanceType, MaxSize};
use crate::errors::{ComposeError, ComposeResult};
use crate::resources::autoscaling::Tag;
use crate::resources::elb::{HealthCheck, Listener, LoadBalancer};
use crate::resources::iam::{AccessKey, Policy, PolicyDocument, Statement, User};
use crate::resources::sqs::{Queue, QueuePolicy};
use crate::template::{Output, Parameter, ResourceId, Topology, Value, PSEUDO_ACCOUNT_ID, PSEUDO_REGION};

/// Queue actions granted to everything that publishes to the logging queue.
const QUEUE_WRITE_ACTIONS: [&str; 7] = [
    "sqs:ChangeMessageVisibility",
    "sqs:ChangeMessageVisibilityBatch",
    "sqs:GetQueueAttributes",
    "sqs:GetQueueUrl",
    "sqs:ListQueues",
    "sqs:SendMessage",
    "sqs:SendMessageBatch",
];

/// Instance types with two or more ephemeral volumes, required by the
/// search tier's data nodes.
const VALID_SEARCH_INSTANCE_TYPES: [&str; 18] = [
    "m3.xlarge", "m3.2xlarge", "m1.large", "m1.xlarge", "c3.large", "c3.xlarge", "c3.2xlarge",
    "c3.4xlarge", "c3.8xlarge", "c1.xlarge", "cc2.xlarge", "cg1.4xlarge", "m2.4xlarge",
    "cr1.8xlarge", "i2.2xlarge", "i2.4xlarge", "hs1.8xlarge", "hi1.4xlarge",
];

const VALID_SEARCH_INSTANCE_TYPE_MESSAGE: &str =
    "must be an instance type that supports 2 or more ephemeral volumes.";

/// Search (Elasticsearch) tier options with their documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchTierConfig {
    pub instance_type_default: String,
    /// Fixed cluster size; the search tier does not autoscale
    pub cluster_size: u32,
    pub root_volume_type: String,
    pub instance_monitoring: bool,
    pub http_port: u16,
    pub cluster_from_port: u16,
    pub cluster_to_port: u16,
    pub install_deb_url: String,
    pub default_plugins: String,
    pub cluster_name: String,
    pub discovery_tag_name: String,
    pub discovery_tag_value: String,
}

impl Default for SearchTierConfig {
    fn default() -> Self {
        Self {
            instance_type_default: "c3.large".to_string(),
            cluster_size: 5,
            root_volume_type: "gp2".to_string(),
            instance_monitoring: true,
            http_port: 9200,
            cluster_from_port: 9200,
            cluster_to_port: 9400,
            install_deb_url:
                "https://s3-us-west-2.amazonaws.com/dualspark-binary-cache/elk/elasticsearch-1.3.2.deb"
                    .to_string(),
            default_plugins:
                "elasticsearch/elasticsearch-cloud-aws/2.1.1,royrusso/elasticsearch-HQ".to_string(),
            cluster_name: "ElkDemo".to_string(),
            discovery_tag_name: "InstanceRole".to_string(),
            discovery_tag_value: "Elasticsearch".to_string(),
        }
    }
}

/// Dashboard (Kibana) tier options with their documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardTierConfig {
    pub instance_type_default: String,
    pub min_size: u32,
    pub max_size: u32,
    pub root_volume_type: String,
    pub instance_monitoring: bool,
    pub port: u16,
    pub healthcheck_port: u16,
    pub remote_access_cidr: String,
    pub install_tgz_url: String,
}

impl Default for DashboardTierConfig {
    fn default() -> Self {
        Self {
            instance_type_default: "t1.micro".to_string(),
            min_size: 1,
            max_size: 4,
            root_volume_type: "gp2".to_string(),
            instance_monitoring: true,
            port: 80,
            healthcheck_port: 81,
            remote_access_cidr: "0.0.0.0/0".to_string(),
            install_tgz_url:
                "https://s3-us-west-2.amazonaws.com/dualspark-binary-cache/elk/kibana-3.1.0.tar.gz"
                    .to_string(),
        }
    }
}

/// Indexer (Logstash) tier options with their documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerTierConfig {
    pub instance_type_default: String,
    pub min_size: u32,
    pub max_size: u32,
    pub root_volume_type: String,
    pub instance_monitoring: bool,
    pub install_deb_url: String,
    pub grok_files_url: String,
    pub output_flush_size: u32,
    pub queue_threads: u32,
    pub high_queue_depth_threshold: i64,
    pub low_queue_depth_threshold: i64,
}

impl Default for IndexerTierConfig {
    fn default() -> Self {
        Self {
            instance_type_default: "c3.large".to_string(),
            min_size: 1,
            max_size: 20,
            root_volume_type: "gp2".to_string(),
            instance_monitoring: true,
            install_deb_url:
                "https://s3-us-west-2.amazonaws.com/dualspark-binary-cache/elk/logstash_1.4.2-1-2c0f5a1_all.deb"
                    .to_string(),
            grok_files_url:
                "https://s3-us-west-2.amazonaws.com/pmdevops/demo/elasticsearch/demogrok.txt"
                    .to_string(),
            output_flush_size: 500,
            queue_threads: 40,
            high_queue_depth_threshold: 10000,
            low_queue_depth_threshold: 1000,
        }
    }
}

/// Scheduler tier options with their documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerTierConfig {
    pub instance_type_default: String,
    pub root_volume_type: String,
    pub instance_monitoring: bool,
    pub snapshot_name_default: String,
    pub snapshot_key_prefix_default: String,
    pub snapshot_frequency_default: u32,
}

impl Default for SchedulerTierConfig {
    fn default() -> Self {
        Self {
            instance_type_default: "t1.micro".to_string(),
            root_volume_type: "gp2".to_string(),
            instance_monitoring: true,
            snapshot_name_default: "ElasticsearchBackup".to_string(),
            snapshot_key_prefix_default: "backup/elasticsearch".to_string(),
            snapshot_frequency_default: 60,
        }
    }
}

/// Full profile configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingProfileConfig {
    pub search: SearchTierConfig,
    pub dashboard: DashboardTierConfig,
    pub indexer: IndexerTierConfig,
    pub scheduler: SchedulerTierConfig,
    /// Region-to-AMI lookup table, provided by the surrounding tooling
    pub region_ami_map: Json,
}

/// Opaque per-tier boot script texts, copied verbatim into payloads.
#[derive(Debug, Clone, Default)]
pub struct BootstrapScripts {
    pub search: String,
    pub dashboard: String,
    pub indexer: String,
    pub scheduler: String,
    /// Snapshot tool installed on the scheduler instance
    pub snapshot_tool: String,
}

/// The composed log-analytics deployment profile.
#[derive(Debug, Clone, Default)]
pub struct LoggingProfile {
    pub config: LoggingProfileConfig,
    pub scripts: BootstrapScripts,
}

impl LoggingProfile {
    /// Compose the whole profile onto `topology` in dependency order.
    pub fn compose(
        &self,
        topology: &mut Topology,
        network: &NetworkContext,
    ) -> ComposeResult<BuiltTiers> {
        let ami_map = if self.config.region_ami_map.is_null() {
            json!({})
        } else {
            self.config.region_ami_map.clone()
        };
        topology.merge_mapping(REGION_AMI_MAPPING, ami_map)?;

        let search = self.config.search.clone();
        let dashboard = self.config.dashboard.clone();
        let indexer = self.config.indexer.clone();
        let scheduler = self.config.scheduler.clone();
        let scripts = self.scripts.clone();
        let search_http_port = search.http_port;

        let scripts_search = scripts.search.clone();
        let scripts_dashboard = scripts.dashboard.clone();
        let scripts_indexer = scripts.indexer.clone();
        let scripts_scheduler = scripts.scheduler.clone();
        let snapshot_tool = scripts.snapshot_tool.clone();

        Assembler::new()
            .step("messaging", &[], |topology, _, _| {
                build_messaging(topology)
            })
            .step("elasticsearch", &["messaging"], move |topology, network, built| {
                build_search_tier(topology, network, built, &search, &scripts_search)
            })
            .step(
                "kibana",
                &["messaging", "elasticsearch"],
                move |topology, network, built| {
                    build_dashboard_tier(
                        topology,
                        network,
                        built,
                        &dashboard,
                        search_http_port,
                        &scripts_dashboard,
                    )
                },
            )
            .step(
                "logstashIndexer",
                &["messaging", "elasticsearch"],
                move |topology, network, built| {
                    build_indexer_tier(
                        topology,
                        network,
                        built,
                        &indexer,
                        search_http_port,
                        &scripts_indexer,
                    )
                },
            )
            .step("scheduler", &["elasticsearch"], move |topology, network, built| {
                build_scheduler_tier(
                    topology,
                    network,
                    built,
                    &scheduler,
                    search_http_port,
                    &scripts_scheduler,
                    &snapshot_tool,
                )
            })
            .step("logShipper", &["messaging"], |topology, _, built| {
                build_log_shipper(topology, built)
            })
            .run(topology, network)
    }
}

/// Policy granting queue-write access to the logging queue.
fn queue_write_policy(name: &str, logging_queue: &ResourceId) -> Policy {
    Policy::new(
        name,
        vec![Statement::allow(
            QUEUE_WRITE_ACTIONS,
            vec![logging_queue.get_att("Arn")],
        )],
    )
}

/// The two backup-bucket policies shared by tiers that snapshot to S3.
fn backup_bucket_policies(bucket: &Value) -> Vec<Policy> {
    vec![
        Policy::new(
            "s3AllForBackupBucket",
            vec![Statement::allow(
                ["s3:*"],
                vec![Value::join(
                    "",
                    vec![Value::from("arn:aws:s3:::"), bucket.clone(), Value::from("/*")],
                )],
            )],
        ),
        Policy::new(
            "s3ListAndGetBucket",
            vec![Statement::allow(
                ["s3:List*", "s3:GetBucket*"],
                Value::from("arn:aws:s3:::*"),
            )],
        ),
    ]
}

/// The search-tier balancer group of a previously built search tier.
fn search_elb_endpoint(built: &BuiltTiers) -> ComposeResult<GroupEndpoint> {
    let search = built.get("elasticsearch")?;
    let group = search.elb_security_group.as_ref().ok_or_else(|| {
        ComposeError::unresolved("elasticsearchElbSecurityGroup", "search tier has no balancer group")
    })?;
    Ok(GroupEndpoint::group("elasticsearchElb", group))
}

fn build_messaging(topology: &mut Topology) -> ComposeResult<TierHandles> {
    let logging_queue = topology.add_resource("loggingQueue", &Queue::new())?;
    let file_queue = topology.add_resource("fileTransferQueue", &Queue::new())?;

    topology.add_output(
        Output::new("fileTransferQueue", file_queue.reference())
            .description("Queue for receiving notifications that log files have been dropped."),
    )?;

    let source_arn = Value::join(
        ":",
        vec![
            Value::from("arn"),
            Value::from("aws"),
            Value::from("s3"),
            Value::reference(PSEUDO_ACCOUNT_ID),
            Value::from("*"),
            Value::from("*"),
        ],
    );
    topology.add_resource(
        "fileQueuePolicy",
        &QueuePolicy::new(
            PolicyDocument::new(vec![Statement::allow(
                ["SQS:SendMessage"],
                file_queue.get_att("Arn"),
            )
            .principal(json!({"AWS": "*"}))
            .condition(json!({"StringLike": {"aws:SourceArn": source_arn}}))]),
            vec![file_queue.reference()],
        ),
    )?;

    let mut handles = TierHandles::default();
    handles.insert_extra("loggingQueue", logging_queue);
    handles.insert_extra("fileTransferQueue", file_queue);
    Ok(handles)
}

fn build_search_tier(
    topology: &mut Topology,
    network: &NetworkContext,
    built: &BuiltTiers,
    config: &SearchTierConfig,
    script: &str,
) -> ComposeResult<TierHandles> {
    let logging_queue = built.get("messaging")?.extra("loggingQueue")?.clone();
    let mut builder = TierBuilder::new(topology, network, "elasticsearch");

    let instance_sg = builder.instance_security_group(
        "Security group allows ingress from elasticsearch elb via http with self-referencing \
         rules for clustering as well as other common rules used in accessing the system",
        vec![],
    )?;
    let elb_sg = builder.elb_security_group(
        "Security group allows ingress to the elb and egress to Elasticsearch only on tcp port 9200",
        vec![],
    )?;

    // Degraded path: a surrounding composition may already provide the
    // bastion group as a resource; otherwise declare the parameter.
    let bastion = if builder.topology().has_resource("bastionSecurityGroup") {
        GroupEndpoint::external("bastion", Value::reference("bastionSecurityGroup"))
    } else {
        let parameter = builder.topology().import_parameter(
            Parameter::string("bastionSecurityGroup")
                .description("ID of the Bastion Host security group."),
        )?;
        GroupEndpoint::external("bastion", parameter.reference())
    };
    let elb_endpoint = GroupEndpoint::group("elasticsearchElb", &elb_sg);
    let instance_endpoint = GroupEndpoint::group("elasticsearchInstance", &instance_sg);

    pair_security_groups(
        builder.topology(),
        Some(&bastion),
        Some(&elb_endpoint),
        config.http_port,
    )?;
    pair_security_groups(
        builder.topology(),
        Some(&elb_endpoint),
        Some(&instance_endpoint),
        config.http_port,
    )?;
    pair_security_groups(
        builder.topology(),
        Some(&instance_endpoint),
        Some(&instance_endpoint),
        PortRange::new(config.cluster_from_port, config.cluster_to_port),
    )?;

    let plugins = builder.topology().add_parameter(
        Parameter::string("elasticsearchPlugins")
            .default(&config.default_plugins)
            .description(
                "Comma separated list of Elasticsearch plugins to install. Note that cloud-aws \
                 is reqired for AWS cluster discovery",
            ),
    )?;
    let deb_package = builder.topology().add_parameter(
        Parameter::string("elasticsearchInstallDeb")
            .default(&config.install_deb_url)
            .description(
                "Address from which to download the Elasticsearch debian package for installing \
                 the service itself",
            ),
    )?;
    let cluster_name = builder.topology().add_parameter(
        Parameter::string("elasticsearchClusterName")
            .default(&config.cluster_name)
            .min_length(4)
            .max_length(32)
            .description(
                "Name to assign to the cluster itself. Used for identifying the whole \
                 Elasticsearch cluster together as a group.",
            )
            .constraint_description(
                "Cluster name must be at least 4 and no more than 32 characters long.",
            ),
    )?;

    let mut policies = vec![
        queue_write_policy("sqsWrite", &logging_queue),
        Policy::new(
            "ec2DescribeAllInstancesInRegion",
            vec![Statement::allow(["ec2:Describe*"], Value::from("*"))],
        ),
    ];
    policies.extend(backup_bucket_policies(&network.utility_bucket));
    let instance_profile = builder.instance_profile(policies)?;

    let user_data = BootstrapBuilder::for_tier("elasticsearch")
        .var("ES_DOWNLOAD", deb_package.reference())?
        .var("ES_PLUGINS", plugins.reference())?
        .var("ES_CLUSTER_NAME", cluster_name.reference())?
        .var("ES_TAG_NAME", config.discovery_tag_name.as_str())?
        .var("ES_TAG_VALUE", config.discovery_tag_value.as_str())?
        .script(script)
        .into_user_data();

    let load_balancer = builder.topology().add_resource(
        "elasticsearchInternalElb",
        &LoadBalancer::new(
            network.private_subnets.clone(),
            elb_sg.reference(),
            HealthCheck::standard(format!("HTTP:{}/", config.http_port)),
        )
        .access_logging(network.utility_bucket.clone())
        .listener(Listener::new(config.http_port, config.http_port, "HTTP"))
        .internal(),
    )?;

    let group = builder.create_asg(AsgSpec {
        ami_name: "elasticsearch".to_string(),
        instance_type: InstanceType::constrained(
            &config.instance_type_default,
            VALID_SEARCH_INSTANCE_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            VALID_SEARCH_INSTANCE_TYPE_MESSAGE,
        ),
        security_groups: vec![instance_sg.reference()],
        instance_profile: Some(instance_profile.reference()),
        user_data: Some(user_data),
        min_size: config.cluster_size,
        max_size: MaxSize::Literal(config.cluster_size),
        load_balancer: Some(load_balancer.clone()),
        instance_monitoring: config.instance_monitoring,
        root_volume_type: config.root_volume_type.clone(),
        custom_tags: vec![Tag::new(
            &config.discovery_tag_name,
            &config.discovery_tag_value,
            true,
        )],
    })?;

    let mut handles = TierHandles::default();
    handles.instance_security_group = Some(instance_sg);
    handles.elb_security_group = Some(elb_sg);
    handles.load_balancer = Some(load_balancer);
    handles.auto_scaling_group = Some(group);
    handles.instance_profile = Some(instance_profile);
    Ok(handles)
}

fn build_dashboard_tier(
    topology: &mut Topology,
    network: &NetworkContext,
    built: &BuiltTiers,
    config: &DashboardTierConfig,
    search_http_port: u16,
    script: &str,
) -> ComposeResult<TierHandles> {
    let logging_queue = built.get("messaging")?.extra("loggingQueue")?.clone();
    let search_elb = built.get("elasticsearch")?.require_load_balancer()?.clone();
    let search_elb_group = search_elb_endpoint(built)?;

    let mut builder = TierBuilder::new(topology, network, "kibana");
    builder.validate_sizes(config.min_size, config.max_size)?;

    let elb_sg = builder.elb_security_group(
        "Security group allowing public ingress into the elb via http connecting back to an \
         auto scaling group of kibana instances",
        vec![crate::resources::ec2::SecurityGroupRule::tcp_cidr(
            config.port,
            config.port,
            config.remote_access_cidr.as_str(),
        )],
    )?;
    let instance_sg = builder.instance_security_group(
        "Security group allows ingress from kibana elb via http as well as other common rules \
         used in accessing the system",
        vec![],
    )?;

    let elb_endpoint = GroupEndpoint::group("kibanaElb", &elb_sg);
    let instance_endpoint = GroupEndpoint::group("kibanaInstance", &instance_sg);
    pair_security_groups(
        builder.topology(),
        Some(&elb_endpoint),
        Some(&instance_endpoint),
        PortRange::new(config.port, config.healthcheck_port),
    )?;
    pair_security_groups(
        builder.topology(),
        Some(&instance_endpoint),
        Some(&search_elb_group),
        search_http_port,
    )?;

    let download_package = builder.topology().add_parameter(
        Parameter::string("kibanaInstallTgz")
            .default(&config.install_tgz_url)
            .description("Address from which to download the Kibana tgz file to unpack and install"),
    )?;
    let password = builder.topology().add_parameter(
        Parameter::secret("kibanaAccessPassword")
            .default("P@ssword!")
            .min_length(4)
            .max_length(20)
            .description("Password to use when accessing the front end of Kibana")
            .constraint_description("Password must be at least 4 characters and no more than 20."),
    )?;

    let load_balancer = builder.topology().add_resource(
        "kibanaExternalElb",
        &LoadBalancer::new(
            network.public_subnets.clone(),
            elb_sg.reference(),
            HealthCheck::standard(format!("HTTP:{}/", config.healthcheck_port)),
        )
        .access_logging(network.utility_bucket.clone())
        .listener(Listener::new(config.port, config.port, "HTTP")),
    )?;

    let mut policies = vec![queue_write_policy("sqsWrite", &logging_queue)];
    policies.extend(backup_bucket_policies(&network.utility_bucket));
    let instance_profile = builder.instance_profile(policies)?;

    let user_data = BootstrapBuilder::for_tier("kibana")
        .var("KIBANA_PASSWORD", password.reference())?
        .var("KIBANA_URL", download_package.reference())?
        .var("ELASTICSEARCH_ELB_DNS_NAME", search_elb.get_att("DNSName"))?
        .var("ELASTICSEARCH_BACKUP_BUCKET", network.utility_bucket.clone())?
        .script(script)
        .into_user_data();

    let group = builder.create_asg(AsgSpec {
        ami_name: "kibana".to_string(),
        instance_type: InstanceType::default(&config.instance_type_default),
        security_groups: vec![instance_sg.reference()],
        instance_profile: Some(instance_profile.reference()),
        user_data: Some(user_data),
        min_size: config.min_size,
        max_size: MaxSize::Literal(config.max_size),
        load_balancer: Some(load_balancer.clone()),
        instance_monitoring: config.instance_monitoring,
        root_volume_type: config.root_volume_type.clone(),
        custom_tags: vec![],
    })?;

    builder.topology().add_output(
        Output::new(
            "elasticsearchHQDashboard",
            Value::join(
                "",
                vec![
                    Value::from("http://"),
                    load_balancer.get_att("DNSName"),
                    Value::from("/elasticsearch/_plugin/HQ/index.html"),
                ],
            ),
        )
        .description(
            "Direct url to Elasticsearch HQ plugin (if installed) to show cluster health \
             information via the ElasticsearchHQ project.",
        ),
    )?;
    builder.topology().add_output(
        Output::new(
            "kibanaDashboard",
            Value::join(
                "",
                vec![
                    Value::from("http://"),
                    load_balancer.get_att("DNSName"),
                    Value::from("/index.html"),
                ],
            ),
        )
        .description("Direct url to access the kibana front-end dashboard pages."),
    )?;

    let mut handles = TierHandles::default();
    handles.instance_security_group = Some(instance_sg);
    handles.elb_security_group = Some(elb_sg);
    handles.load_balancer = Some(load_balancer);
    handles.auto_scaling_group = Some(group);
    handles.instance_profile = Some(instance_profile);
    Ok(handles)
}

fn build_indexer_tier(
    topology: &mut Topology,
    network: &NetworkContext,
    built: &BuiltTiers,
    config: &IndexerTierConfig,
    search_http_port: u16,
    script: &str,
) -> ComposeResult<TierHandles> {
    let logging_queue = built.get("messaging")?.extra("loggingQueue")?.clone();
    let search_elb = built.get("elasticsearch")?.require_load_balancer()?.clone();
    let search_elb_group = search_elb_endpoint(built)?;

    let mut builder = TierBuilder::new(topology, network, "logstashIndexer");

    // Validate every numeric bound before registering anything
    builder.validate_sizes(config.min_size, config.max_size)?;
    if config.high_queue_depth_threshold <= config.low_queue_depth_threshold {
        return Err(ComposeError::configuration(
            "logstashIndexer",
            "high_queue_depth_threshold",
            format!(
                "high threshold {} must be greater than low threshold {}",
                config.high_queue_depth_threshold, config.low_queue_depth_threshold
            ),
        ));
    }

    let instance_sg = builder.instance_security_group(
        "Security group allows egress to Elasticsearch on tcp port 9200 as well as other common \
         rules used in accessing the system",
        vec![],
    )?;
    pair_security_groups(
        builder.topology(),
        Some(&GroupEndpoint::group("logstashIndexerInstance", &instance_sg)),
        Some(&search_elb_group),
        search_http_port,
    )?;

    // The install-deb and grok-file parameters are not injected into the
    // payload; the boot script reads them from the stack through the
    // cloudformationRead policy below.
    builder.topology().add_parameter(
        Parameter::string("logstashIndexerInstallDeb")
            .default(&config.install_deb_url)
            .description(
                "Location from which to download the Logstash debian package for installation on \
                 the indexer layer",
            ),
    )?;
    let max_cluster_size = builder.topology().add_parameter(
        Parameter::number("logstashIndexerMaxClusterSize")
            .min_value(i64::from(config.min_size))
            .max_value(i64::from(config.max_size))
            .default(config.max_size.to_string())
            .description("Maximum size the indexer cluster will scale up to")
            .constraint_description(format!(
                "Logstash indexer size must be at least {} and no larger than {}",
                config.min_size, config.max_size
            )),
    )?;
    builder.topology().add_parameter(
        Parameter::string("logstashIndexerGrokFiles")
            .default(&config.grok_files_url)
            .description(
                "Comma separated collection of URLs to use to get grok patterns for Logstash \
                 parsing of log messgaes",
            ),
    )?;

    let policies = vec![
        Policy::new(
            "cloudformationRead",
            vec![Statement::allow(
                [
                    "cloudformation:DescribeStackEvents",
                    "cloudformation:DescribeStackResource",
                    "cloudformation:DescribeStackResources",
                    "cloudformation:DescribeStacks",
                    "cloudformation:ListStacks",
                    "cloudformation:ListStackResources",
                ],
                Value::from("*"),
            )],
        ),
        Policy::new(
            "SQSWrite",
            vec![Statement::allow(["sqs:*"], logging_queue.get_att("Arn"))],
        ),
    ];
    let instance_profile = builder.instance_profile(policies)?;

    let user_data = BootstrapBuilder::for_tier("logstashIndexer")
        .var("LOGGING_QUEUE_NAME", logging_queue.get_att("QueueName"))?
        .var("LOGGING_QUEUE_REGION", Value::reference(PSEUDO_REGION))?
        .var("ELASTICSEARCH_ELB_DNS_NAME", search_elb.get_att("DNSName"))?
        .var("ELASTICSEARCH_PORT", search_http_port.to_string())?
        .var("INDEXER_OUTPUT_FLUSH_SIZE", config.output_flush_size.to_string())?
        .var("LOGGING_QUEUE_THREADS", config.queue_threads.to_string())?
        .script(script)
        .into_user_data();

    let group = builder.create_asg(AsgSpec {
        ami_name: "ubuntuElkLogstash".to_string(),
        instance_type: InstanceType::default(&config.instance_type_default),
        security_groups: vec![instance_sg.reference()],
        instance_profile: Some(instance_profile.reference()),
        user_data: Some(user_data),
        min_size: config.min_size,
        max_size: MaxSize::Parameter(max_cluster_size),
        load_balancer: None,
        instance_monitoring: config.instance_monitoring,
        root_volume_type: config.root_volume_type.clone(),
        custom_tags: vec![],
    })?;

    wire_thresholds(
        builder.topology(),
        "loggingIndexer",
        &group,
        &MetricRef::queue_depth(&logging_queue),
        ThresholdScalingConfig::for_thresholds(
            config.high_queue_depth_threshold,
            config.low_queue_depth_threshold,
        ),
    )?;

    let mut handles = TierHandles::default();
    handles.instance_security_group = Some(instance_sg);
    handles.auto_scaling_group = Some(group);
    handles.instance_profile = Some(instance_profile);
    Ok(handles)
}

#[allow(clippy::too_many_arguments)]
fn build_scheduler_tier(
    topology: &mut Topology,
    network: &NetworkContext,
    built: &BuiltTiers,
    config: &SchedulerTierConfig,
    search_http_port: u16,
    script: &str,
    snapshot_tool: &str,
) -> ComposeResult<TierHandles> {
    let search_elb = built.get("elasticsearch")?.require_load_balancer()?.clone();
    let search_elb_group = search_elb_endpoint(built)?;

    let mut builder = TierBuilder::new(topology, network, "scheduler");

    let instance_sg = builder.instance_security_group(
        "Security group allows ingress to Elasticsearch ELB to manage backup snapshots and \
         other scheduled tasks as needed",
        vec![],
    )?;
    pair_security_groups(
        builder.topology(),
        Some(&GroupEndpoint::group("schedulerInstance", &instance_sg)),
        Some(&search_elb_group),
        search_http_port,
    )?;

    let snapshot_name = builder.topology().add_parameter(
        Parameter::string("elasticsearchSnapshotName")
            .default(&config.snapshot_name_default)
            .min_length(4)
            .max_length(32)
            .description("Name to use when creating the Elasticsearch snapshot for backups")
            .constraint_description("must be at least 4 characters and no more than 32."),
    )?;
    let key_prefix = builder.topology().add_parameter(
        Parameter::string("elasticsearchSnapshotKeyNamePrefix")
            .default(&config.snapshot_key_prefix_default)
            .min_length(2)
            .max_length(128)
            .description("S3 Key name prefix to apply to the Elasticsearch snapshot")
            .constraint_description("must be at least 2 characters and no more than 128."),
    )?;
    let frequency = builder.topology().add_parameter(
        Parameter::number("elasticsearchSnapshotFrequency")
            .default(config.snapshot_frequency_default.to_string())
            .min_value(5)
            .max_value(60)
            .description("Interval in minutes to run the elasticsearch snapshot process")
            .constraint_description("must be at least 5 and no more than 60."),
    )?;

    let instance_profile = builder.instance_profile(vec![])?;

    let user_data = BootstrapBuilder::for_tier("scheduler")
        .var("ELASTICSEARCH_ELB_DNS_NAME", search_elb.get_att("DNSName"))?
        .var("BACKUP_REPO_NAME", snapshot_name.reference())?
        .var("BUCKET_NAME", network.utility_bucket.clone())?
        .var("BUCKET_REGION", Value::reference(PSEUDO_REGION))?
        .var("KEY_NAME_PREFIX", key_prefix.reference())?
        .script(script)
        .fragment("cat > /opt/elk_scheduler/elasticsearch.snapshot.py << EOF")
        .script(snapshot_tool)
        .fragment("EOF")
        .fragment("chmod +x /opt/elk_scheduler/elasticsearch.snapshot.py")
        .fragment(Value::join(
            "",
            vec![
                Value::from("echo \"*/"),
                frequency.reference(),
                Value::from(
                    " * * * * root python /opt/elk_scheduler/elasticsearch.snapshot.py create \
                     $ELASTICSEARCH_ELB_DNS_NAME --repo_name $BACKUP_REPO_NAME --bucket_name \
                     $BUCKET_NAME --bucket_region $BUCKET_REGION --key_name_prefix \
                     $KEY_NAME_PREFIX\" >> /etc/crontab",
                ),
            ],
        ))
        .into_user_data();

    let group = builder.create_asg(AsgSpec {
        ami_name: "scheduler".to_string(),
        instance_type: InstanceType::default(&config.instance_type_default),
        security_groups: vec![instance_sg.reference()],
        instance_profile: Some(instance_profile.reference()),
        user_data: Some(user_data),
        min_size: 1,
        max_size: MaxSize::Literal(1),
        load_balancer: None,
        instance_monitoring: config.instance_monitoring,
        root_volume_type: config.root_volume_type.clone(),
        custom_tags: vec![],
    })?;

    let mut handles = TierHandles::default();
    handles.instance_security_group = Some(instance_sg);
    handles.auto_scaling_group = Some(group);
    handles.instance_profile = Some(instance_profile);
    Ok(handles)
}

fn build_log_shipper(topology: &mut Topology, built: &BuiltTiers) -> ComposeResult<TierHandles> {
    let logging_queue = built.get("messaging")?.extra("loggingQueue")?.clone();

    let user = topology.add_resource(
        "logShipperUser",
        &User::with_policies(vec![queue_write_policy("sqsWrite", &logging_queue)]),
    )?;
    let key = topology.add_resource("logShipperKeys", &AccessKey::for_user(user.reference()))?;

    topology.add_output(
        Output::new("logShipperAccessKeyId", key.reference())
            .description("AWS Access Key ID to use when configuring external log shippers"),
    )?;
    topology.add_output(
        Output::new("logShipperSecretKeyId", key.get_att("SecretAccessKey"))
            .description("AWS Secret Access Key to use when configuring external log shippers"),
    )?;
    topology.add_output(
        Output::new("logShipperQueueName", logging_queue.get_att("QueueName")).description(
            "Name of the SQS queue for log shipping to use when configuring external log \
             shippers to publish to this deployment of Elasticsearch",
        ),
    )?;
    topology.add_output(
        Output::new("logShipperQueueRegion", Value::reference(PSEUDO_REGION)).description(
            "Region where the log shipping queue is deployed to use when configuring external \
             log shippers",
        ),
    )?;

    Ok(TierHandles::default())
}
