mod concurrent_queuing;
