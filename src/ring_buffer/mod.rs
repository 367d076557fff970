//fixed-capacity history ring, oldest slot overwritten first
//every slot starts at T::default(), so the ring is always "full"
pub struct RingBuffer<T>{
    buffer: Vec<T>,
    head: usize,        //next slot to overwrite (= oldest slot)
    write_epoch: u64,   //number of pushes so far
    capacity: usize,
}

impl<T: Clone + Default> RingBuffer<T>{
    //creating a new ring with `capacity` default slots
    pub fn new(capacity: usize) -> Self{
        assert!(capacity > 0, "Capacity must be greater than 0");

        let mut buffer = Vec::with_capacity(capacity);
        for _ in 0..capacity{
            buffer.push(T::default());
        }

        RingBuffer{
            buffer,
            head: 0,
            write_epoch: 0,
            capacity,
        }
    }

    //push item, evicting the oldest
    //return the epoch num. of the push
    pub fn push(&mut self, item: T) -> u64{
        self.buffer[self.head] = item;
        self.head = (self.head + 1) % self.capacity;
        self.write_epoch += 1;
        self.write_epoch
    }

    //iterate oldest -> newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_{
        (0..self.capacity).map(move |i| &self.buffer[(self.head + i) % self.capacity])
    }

    //pushes so far (0 means the ring still holds only defaults)
    pub fn latest_epoch(&self) -> u64{
        self.write_epoch
    }

    //always equal to capacity
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize{
        self.capacity
    }
}
