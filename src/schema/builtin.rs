use crate::registry::ComponentType;
use crate::schema::ItemType;
use crate::schema::ObjectKind;
use crate::schema::ObjectSchema;
use crate::schema::SchemaCatalog;
use crate::schema::SchemaItemDescriptor;

fn item(item_type: ItemType) -> SchemaItemDescriptor {
    SchemaItemDescriptor::new(item_type)
}

/// Built-in object-type catalog.
///
/// Covers the dynamically configurable objects of the messaging server:
/// singletons, named composites, fixed-single-instance policy objects, and
/// value-keyed array objects. The sync/standby flags drive HA replication
/// and standby write-protection.
pub fn builtin_catalog() -> SchemaCatalog {
    SchemaCatalog::new([
        // ------------------------------------------------------------------
        // Singletons
        // ------------------------------------------------------------------
        ObjectSchema::new("FIPS", ComponentType::Transport, ObjectKind::Singleton)
            .item("FIPS", item(ItemType::Boolean).with_default(false))
            .synced(),
        ObjectSchema::new("LogLevel", ComponentType::Server, ObjectKind::Singleton)
            .item(
                "LogLevel",
                item(ItemType::Enum)
                    .options(&["MIN", "NORMAL", "MAX"])
                    .with_default("NORMAL"),
            )
            .synced(),
        ObjectSchema::new("ConnectionLog", ComponentType::Server, ObjectKind::Singleton)
            .item(
                "ConnectionLog",
                item(ItemType::Enum)
                    .options(&["MIN", "NORMAL", "MAX"])
                    .with_default("NORMAL"),
            )
            .synced(),
        ObjectSchema::new("TraceLevel", ComponentType::Server, ObjectKind::Singleton)
            .item(
                "TraceLevel",
                item(ItemType::Number).range(1, 9).with_default(5_i64),
            )
            .synced(),
        ObjectSchema::new(
            "MQConnectivityEnabled",
            ComponentType::Server,
            ObjectKind::Singleton,
        )
        .item("MQConnectivityEnabled", item(ItemType::Boolean).with_default(false))
        .synced(),
        ObjectSchema::new("ServerUID", ComponentType::Server, ObjectKind::Singleton)
            .item("ServerUID", item(ItemType::String).not_settable())
            .not_settable()
            .synced(),
        // ------------------------------------------------------------------
        // Transport composites
        // ------------------------------------------------------------------
        ObjectSchema::new("Endpoint", ComponentType::Transport, ObjectKind::Composite)
            .with_uid()
            .item("Port", item(ItemType::Number).range(1, 65535).required())
            .item(
                "Interface",
                item(ItemType::IpAddressList).with_default("All"),
            )
            .item("Protocol", item(ItemType::String).with_default("All"))
            .item("Enabled", item(ItemType::Boolean).with_default(true))
            .item("SecurityProfile", item(ItemType::String))
            .item("MessageHub", item(ItemType::String))
            .item("ConnectionPolicies", item(ItemType::String))
            .item("TopicPolicies", item(ItemType::String))
            .item(
                "MaxMessageSize",
                item(ItemType::BufferSize).with_default("4096KB"),
            )
            .item("Description", item(ItemType::String))
            .synced(),
        ObjectSchema::new("MessageHub", ComponentType::Transport, ObjectKind::Composite)
            .with_uid()
            .item("Description", item(ItemType::String))
            .synced(),
        ObjectSchema::new(
            "CertificateProfile",
            ComponentType::Transport,
            ObjectKind::Composite,
        )
        .with_uid()
        .item("Certificate", item(ItemType::String).required())
        .item("Key", item(ItemType::String).required())
        .synced(),
        ObjectSchema::new(
            "SecurityProfile",
            ComponentType::Transport,
            ObjectKind::Composite,
        )
        .with_uid()
        .item(
            "MinimumProtocolMethod",
            item(ItemType::Enum)
                .options(&["TLSv1", "TLSv1.1", "TLSv1.2"])
                .with_default("TLSv1.2"),
        )
        .item("UseClientCertificate", item(ItemType::Boolean).with_default(false))
        .item(
            "Ciphers",
            item(ItemType::Enum)
                .options(&["SafeCiphers", "FastCiphers", "BestCiphers"])
                .with_default("SafeCiphers"),
        )
        .item("CertificateProfile", item(ItemType::String))
        .item(
            "UsePasswordAuthentication",
            item(ItemType::Boolean).with_default(true),
        )
        .item("TLSEnabled", item(ItemType::Boolean).with_default(true))
        .synced(),
        ObjectSchema::new(
            "AdminEndpoint",
            ComponentType::Transport,
            ObjectKind::Composite,
        )
        .fixed_instance("AdminEndpoint")
        .item("Port", item(ItemType::Number).range(1, 65535).with_default(9089_i64))
        .item("Interface", item(ItemType::IpAddressList).with_default("All"))
        .item("SecurityProfile", item(ItemType::String))
        .item("ConfigurationPolicies", item(ItemType::String)),
        // ------------------------------------------------------------------
        // Security composites
        // ------------------------------------------------------------------
        ObjectSchema::new(
            "ConnectionPolicy",
            ComponentType::Security,
            ObjectKind::Composite,
        )
        .with_uid()
        .item("ClientID", item(ItemType::String))
        .item("ClientAddress", item(ItemType::IpAddressList))
        .item("Protocol", item(ItemType::String))
        .item("AllowDurable", item(ItemType::Boolean).with_default(true))
        .item(
            "AllowPersistentMessages",
            item(ItemType::Boolean).with_default(true),
        )
        .item("Description", item(ItemType::String))
        .synced(),
        ObjectSchema::new("TopicPolicy", ComponentType::Security, ObjectKind::Composite)
            .with_uid()
            .callbacks(&[ComponentType::Security, ComponentType::Engine])
            .item("Topic", item(ItemType::String).required())
            .item("ActionList", item(ItemType::String).required())
            .item(
                "MaxMessages",
                item(ItemType::Number).range(1, 20_000_000).with_default(5000_i64),
            )
            .item("ClientID", item(ItemType::String))
            .item("Description", item(ItemType::String))
            .synced(),
        ObjectSchema::new("QueuePolicy", ComponentType::Security, ObjectKind::Composite)
            .with_uid()
            .callbacks(&[ComponentType::Security, ComponentType::Engine])
            .item("Queue", item(ItemType::String).required())
            .item("ActionList", item(ItemType::String).required())
            .item("Description", item(ItemType::String))
            .synced(),
        ObjectSchema::new(
            "SubscriptionPolicy",
            ComponentType::Security,
            ObjectKind::Composite,
        )
        .with_uid()
        .callbacks(&[ComponentType::Security, ComponentType::Engine])
        .item("Subscription", item(ItemType::String).required())
        .item("ActionList", item(ItemType::String).required())
        .synced(),
        ObjectSchema::new(
            "ConfigurationPolicy",
            ComponentType::Security,
            ObjectKind::Composite,
        )
        .with_uid()
        .item("ActionList", item(ItemType::String).required())
        .item("ClientAddress", item(ItemType::IpAddressList))
        .item("UserID", item(ItemType::String))
        .item("GroupID", item(ItemType::String))
        .item("CommonNames", item(ItemType::String))
        .item("Description", item(ItemType::String))
        .synced(),
        ObjectSchema::new("LDAP", ComponentType::Security, ObjectKind::Composite)
            .fixed_instance("ldapconfig")
            .item("URL", item(ItemType::String).required())
            .item("BaseDN", item(ItemType::String).required())
            .item("BindDN", item(ItemType::String))
            .item("BindPassword", item(ItemType::String))
            .item("UserSuffix", item(ItemType::String))
            .item("GroupSuffix", item(ItemType::String))
            .item("Enabled", item(ItemType::Boolean).with_default(false))
            .item("Verify", item(ItemType::Boolean).with_default(false))
            .synced(),
        // ------------------------------------------------------------------
        // Engine composites
        // ------------------------------------------------------------------
        ObjectSchema::new("Queue", ComponentType::Engine, ObjectKind::Composite)
            .with_uid()
            .standby_local()
            .item(
                "MaxMessages",
                item(ItemType::Number).range(1, 20_000_000).with_default(5000_i64),
            )
            .item("AllowSend", item(ItemType::Boolean).with_default(true))
            .item(
                "ConcurrentConsumers",
                item(ItemType::Boolean).with_default(true),
            )
            .item("Description", item(ItemType::String))
            .synced(),
        ObjectSchema::new(
            "ResourceSetDescriptor",
            ComponentType::Engine,
            ObjectKind::Composite,
        )
        .fixed_instance("ResourceSetDescriptor")
        .standby_local()
        .item("ClientID", item(ItemType::Regex))
        .item("Topic", item(ItemType::Regex))
        .synced(),
        // ------------------------------------------------------------------
        // HA / Cluster composites (schema-fixed single instances)
        // ------------------------------------------------------------------
        ObjectSchema::new(
            "HighAvailability",
            ComponentType::HA,
            ObjectKind::Composite,
        )
        .fixed_instance("haconfig")
        .item("EnableHA", item(ItemType::Boolean).with_default(false))
        .item("Group", item(ItemType::String))
        .item("RemoteDiscoveryNIC", item(ItemType::IpAddressList))
        .item("LocalReplicationNIC", item(ItemType::IpAddressList))
        .item("LocalDiscoveryNIC", item(ItemType::IpAddressList))
        .item(
            "DiscoveryTimeout",
            item(ItemType::Number).range(10, 2_147_483_647).with_default(600_i64),
        )
        .item(
            "HeartbeatTimeout",
            item(ItemType::Number).range(1, 2_147_483_647).with_default(10_i64),
        )
        .item(
            "StartupMode",
            item(ItemType::Enum)
                .options(&["AutoDetect", "StandAlone"])
                .with_default("AutoDetect"),
        )
        .item("PreferredPrimary", item(ItemType::Boolean).with_default(false)),
        ObjectSchema::new(
            "ClusterMembership",
            ComponentType::Cluster,
            ObjectKind::Composite,
        )
        .fixed_instance("cluster")
        .standby_local()
        .item(
            "EnableClusterMembership",
            item(ItemType::Boolean).with_default(false),
        )
        .item("ClusterName", item(ItemType::String))
        .item("ControlAddress", item(ItemType::IpAddressList))
        .item("MessagingAddress", item(ItemType::IpAddressList))
        .item("DiscoveryServerList", item(ItemType::String))
        .item(
            "UseMulticastDiscovery",
            item(ItemType::Boolean).with_default(true),
        )
        .synced(),
        ObjectSchema::new("Syslog", ComponentType::Server, ObjectKind::Composite)
            .fixed_instance("Syslog")
            .item("Host", item(ItemType::String).with_default("127.0.0.1"))
            .item("Port", item(ItemType::Number).range(1, 65535).with_default(514_i64))
            .item(
                "Protocol",
                item(ItemType::Enum).options(&["tcp", "udp"]).with_default("tcp"),
            )
            .item("Enabled", item(ItemType::Boolean).with_default(false)),
        // ------------------------------------------------------------------
        // MQ connectivity composites
        // ------------------------------------------------------------------
        ObjectSchema::new(
            "MQCertificate",
            ComponentType::MQConnectivity,
            ObjectKind::Composite,
        )
        .fixed_instance("MQCert")
        .item("MQSSLKey", item(ItemType::String))
        .item("MQStashPassword", item(ItemType::String)),
        ObjectSchema::new(
            "QueueManagerConnection",
            ComponentType::MQConnectivity,
            ObjectKind::Composite,
        )
        .with_uid()
        .item("QueueManagerName", item(ItemType::String).required())
        .item("ConnectionName", item(ItemType::String).required())
        .item("ChannelName", item(ItemType::String).required())
        .item("SSLCipherSpec", item(ItemType::String))
        .synced(),
        ObjectSchema::new(
            "DestinationMappingRule",
            ComponentType::MQConnectivity,
            ObjectKind::Composite,
        )
        .with_uid()
        .item("QueueManagerConnection", item(ItemType::String).required())
        .item("RuleType", item(ItemType::Number).range(1, 14).required())
        .item("Source", item(ItemType::String).required())
        .item("Destination", item(ItemType::String).required())
        .item("Enabled", item(ItemType::Boolean).with_default(true))
        .item(
            "MaxMessages",
            item(ItemType::Number).range(1, 20_000_000).with_default(5000_i64),
        )
        .synced(),
        // ------------------------------------------------------------------
        // Array objects (entries keyed by value, not name)
        // ------------------------------------------------------------------
        ObjectSchema::new("TopicMonitor", ComponentType::Engine, ObjectKind::ArrayOfScalars)
            .id_field("TopicString")
            .standby_local()
            .item("TopicString", item(ItemType::String).required())
            .synced(),
        ObjectSchema::new(
            "ClusterRequestedTopics",
            ComponentType::Engine,
            ObjectKind::ArrayOfScalars,
        )
        .id_field("TopicString")
        .standby_local()
        .item("TopicString", item(ItemType::String).required())
        .synced(),
        ObjectSchema::new(
            "TrustedCertificate",
            ComponentType::Transport,
            ObjectKind::ArrayOfScalars,
        )
        .item("TrustedCertificate", item(ItemType::String).required())
        .item("SecurityProfileName", item(ItemType::String).required())
        .synced(),
        ObjectSchema::new(
            "ClientCertificate",
            ComponentType::Transport,
            ObjectKind::ArrayOfScalars,
        )
        .item("CertificateName", item(ItemType::String).required())
        .item("SecurityProfileName", item(ItemType::String).required())
        .synced(),
    ])
}
