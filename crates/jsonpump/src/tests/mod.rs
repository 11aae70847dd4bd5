mod arbitrary;
mod flatten;
mod property_partition;
mod reference;
