use std::collections::BTreeMap;

use crate::registry::ComponentType;
use crate::value::ConfigValue;

/// Shape of a configuration object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Exactly one implicit instance (e.g. the FIPS flag); reset, never deleted
    Singleton,
    /// Named instances, zero or many (e.g. Endpoint)
    Composite,
    /// Entries keyed by value rather than name (e.g. TopicMonitor)
    ArrayOfScalars,
}

/// Value domain of one schema item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    String,
    Number,
    Boolean,
    Enum,
    IpAddressList,
    Regex,
    BufferSize,
    Selector,
}

/// Per-property metadata: whether it may be set, how it is typed, what its
/// default is, and whether it must be present after merge.
#[derive(Debug, Clone)]
pub struct SchemaItemDescriptor {
    pub settable: bool,
    pub item_type: ItemType,
    pub default: Option<ConfigValue>,
    pub required: bool,
    pub allow_empty: bool,
    pub enum_options: &'static [&'static str],
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl SchemaItemDescriptor {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            settable: true,
            item_type,
            default: None,
            required: false,
            allow_empty: true,
            enum_options: &[],
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.allow_empty = false;
        self
    }

    pub fn not_settable(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<ConfigValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn options(mut self, options: &'static [&'static str]) -> Self {
        self.enum_options = options;
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// Full schema entry for one object type.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    pub object_type: &'static str,
    pub component: ComponentType,
    pub kind: ObjectKind,
    /// Whole-object settable switch; false rejects every mutation
    pub settable: bool,
    /// Natural-key field for array objects (e.g. TopicString)
    pub id_field: Option<&'static str>,
    /// Instances of this type carry a generated store-wide-unique UID
    pub uses_uid: bool,
    /// Composite with exactly one, schema-fixed instance name
    pub fixed_instance: Option<&'static str>,
    /// False puts the type on the cannot-delete list (e.g. AdminEndpoint)
    pub deletable: bool,
    /// Accepted changes are replicated to the standby node
    pub sync_to_standby: bool,
    /// Subscriber callbacks also run when applying on the standby
    pub callback_on_standby: bool,
    /// Ordered subscriber components; dispatch order is list order
    pub callbacks: Vec<ComponentType>,
    pub items: BTreeMap<&'static str, SchemaItemDescriptor>,
}

impl ObjectSchema {
    pub fn new(object_type: &'static str, component: ComponentType, kind: ObjectKind) -> Self {
        Self {
            object_type,
            component,
            kind,
            settable: true,
            id_field: None,
            uses_uid: false,
            fixed_instance: None,
            deletable: true,
            sync_to_standby: false,
            callback_on_standby: true,
            callbacks: vec![component],
            items: BTreeMap::new(),
        }
    }

    pub fn item(mut self, name: &'static str, descriptor: SchemaItemDescriptor) -> Self {
        self.items.insert(name, descriptor);
        self
    }

    pub fn not_settable(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn id_field(mut self, field: &'static str) -> Self {
        self.id_field = Some(field);
        self
    }

    pub fn with_uid(mut self) -> Self {
        self.uses_uid = true;
        self
    }

    pub fn fixed_instance(mut self, name: &'static str) -> Self {
        self.fixed_instance = Some(name);
        self.deletable = false;
        self
    }

    pub fn not_deletable(mut self) -> Self {
        self.deletable = false;
        self
    }

    pub fn synced(mut self) -> Self {
        self.sync_to_standby = true;
        self
    }

    pub fn standby_local(mut self) -> Self {
        self.callback_on_standby = false;
        self
    }

    pub fn callbacks(mut self, callbacks: &[ComponentType]) -> Self {
        self.callbacks = callbacks.to_vec();
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.kind == ObjectKind::Singleton
    }

    pub fn is_array(&self) -> bool {
        self.kind == ObjectKind::ArrayOfScalars
    }
}
