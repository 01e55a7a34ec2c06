//! Domain layer public interface.
//!
//! Value types passed between publishers, partitions and subscribers. They
//! carry no synchronization of their own; concurrency lives in
//! [`Partition`](crate::Partition) and the subscriber drain workers.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod message;

pub use message::{
    //
    Delivery,
    DeliveryEvent,
    Location,
    Message,
    Offset,
    PartitionId,
    SubscriberId,
    TopicName,
};
